//! Date parsing and formatting helpers shared by the front ends.

use std::io::{self, Write};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::task::Task;
use crate::weather::{WeatherCache, WeatherSnapshot, WeatherState};

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "end of week" / "eow", "end of month" / "eom", "weekend"
/// - "in 3d", "in 2w", "in 1m"
/// - weekday names, optionally prefixed with "this" or "next"
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(end_of_week(today)),
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            return Some(NaiveDate::from_ymd_opt(year, month, 1)? - Duration::days(1));
        }
        "this weekend" | "weekend" => {
            let days_until_saturday = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(days_until_saturday as i64));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let unit_at = rest.char_indices().last().map(|(i, _)| i)?;
        let (count, unit) = rest.split_at(unit_at);
        let count: i64 = count.trim().parse().ok()?;
        let offset = match unit {
            "d" => Duration::try_days(count)?,
            "w" => Duration::try_weeks(count)?,
            // Approximate: 30 days per month
            "m" => Duration::try_days(count.checked_mul(30)?)?,
            _ => return None,
        };
        return today.checked_add_signed(offset);
    }

    let (next_week, name) = if let Some(name) = s.strip_prefix("next ") {
        (true, name)
    } else if let Some(name) = s.strip_prefix("this ") {
        (false, name)
    } else {
        (false, s.as_str())
    };
    if let Some(target) = weekday_index(name) {
        let current = today.weekday().num_days_from_monday();
        let mut ahead = (target + 7 - current) % 7;
        if next_week {
            ahead += 7;
        }
        return Some(today + Duration::days(ahead as i64));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn weekday_index(name: &str) -> Option<u32> {
    const DAYS: [(&str, &str); 7] = [
        ("monday", "mon"),
        ("tuesday", "tue"),
        ("wednesday", "wed"),
        ("thursday", "thu"),
        ("friday", "fri"),
        ("saturday", "sat"),
        ("sunday", "sun"),
    ];
    DAYS.iter()
        .position(|(long, short)| name == *long || name == *short)
        .map(|i| i as u32)
}

/// Sunday of the current ISO week.
pub fn end_of_week(today: NaiveDate) -> NaiveDate {
    let weekday = today.weekday().num_days_from_monday() as i64;
    today - Duration::days(weekday) + Duration::days(6)
}

/// The instant used for a due date picked as a calendar day: local noon.
pub fn due_at_local_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&noon))
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = (due - today).num_days();
    match delta {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {d}d"),
        d => format!("{}d late", -d),
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Icon, temperature and description, e.g. `☂ 12.5°C light rain`.
pub fn reading_label(reading: &WeatherSnapshot) -> String {
    format!(
        "{} {:.1}°C {}",
        reading.condition().glyph(),
        reading.temperature,
        reading.description
    )
}

/// Short weather cell for a task row.
pub fn weather_cell(task: &Task, weather: &WeatherCache) -> String {
    if task.weather_location().is_none() {
        return String::new();
    }
    let entry = weather.entry(task.id).unwrap_or_default();
    match entry.state() {
        WeatherState::Empty => "-".into(),
        WeatherState::Loading => "loading…".into(),
        WeatherState::Failed => "Weather unavailable".into(),
        WeatherState::Loaded => entry
            .data
            .map(|d| reading_label(&d))
            .unwrap_or_default(),
    }
}

/// Write tasks as a formatted table.
pub fn print_table<W: Write>(out: &mut W, tasks: &[&Task], weather: &WeatherCache) -> io::Result<()> {
    writeln!(
        out,
        "{:<5} {:<4} {:<2} {:<7} {:<10} {:<14} {:<32} {}",
        "ID", "Done", "*", "Pri", "Due", "Location", "Task", "Weather"
    )?;
    let today = Local::now().date_naive();
    for t in tasks {
        let due = format_due_relative(t.date.with_timezone(&Local).date_naive(), today);
        let location = t.location.clone().unwrap_or_else(|| "-".into());
        writeln!(
            out,
            "{:<5} {:<4} {:<2} {:<7} {:<10} {:<14} {:<32} {}",
            t.id,
            if t.completed { "[x]" } else { "[ ]" },
            if t.important { "*" } else { "" },
            t.priority,
            due,
            truncate(&location, 14),
            truncate(&t.text, 32),
            weather_cell(t, weather)
        )?;
    }
    Ok(())
}
