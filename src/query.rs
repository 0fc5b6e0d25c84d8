//! Derived, read-only views over the task store.
//!
//! Nothing here is cached: every view is recomputed from the store on demand.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::fields::{FilterKey, SortKey};
use crate::store::TaskStore;
use crate::task::{Task, TaskId};

/// Aggregate counts over every task in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub important: usize,
}

/// Completion progress across all tasks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// 0.0 to 100.0; zero when there are no tasks.
    pub percent: f64,
    /// Every task is done and there is at least one.
    pub all_done: bool,
}

impl Progress {
    pub fn rounded_percent(&self) -> u32 {
        self.percent.round() as u32
    }
}

/// The visible task list for a filter, search term and sort key, using the
/// local calendar day for the `today` filter.
pub fn view<'a>(
    store: &'a TaskStore,
    filter: FilterKey,
    search: &str,
    sort: SortKey,
) -> Vec<&'a Task> {
    view_at(store, filter, search, sort, Local::now().date_naive(), &Local)
}

/// Like [`view`], with the current day and the time zone used to place due
/// dates on calendar days supplied by the caller.
///
/// The completed view is returned as stored: no search, no sort.
pub fn view_at<'a, Tz: TimeZone>(
    store: &'a TaskStore,
    filter: FilterKey,
    search: &str,
    sort: SortKey,
    today: NaiveDate,
    tz: &Tz,
) -> Vec<&'a Task> {
    if filter == FilterKey::Completed {
        return store.completed().iter().collect();
    }

    let needle = search.to_lowercase();
    let mut tasks: Vec<&Task> = store
        .active()
        .iter()
        .filter(|t| match filter {
            FilterKey::Today => local_day(t, tz) == today,
            FilterKey::Important => t.important,
            FilterKey::Assigned => t.assigned_to_me,
            FilterKey::All | FilterKey::Completed => true,
        })
        .filter(|t| needle.is_empty() || t.text.to_lowercase().contains(&needle))
        .collect();

    // `sort_by` is stable, so ties keep their store order.
    tasks.sort_by(|a, b| compare(a, b, sort));
    tasks
}

fn compare(a: &Task, b: &Task, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Date => a.date.cmp(&b.date),
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortKey::Status => a.completed.cmp(&b.completed),
        SortKey::Name => a
            .text
            .to_lowercase()
            .cmp(&b.text.to_lowercase())
            .then_with(|| a.text.cmp(&b.text)),
    }
}

fn local_day<Tz: TimeZone>(task: &Task, tz: &Tz) -> NaiveDate {
    task.date.with_timezone(tz).date_naive()
}

/// Counts over the union of both collections.
pub fn stats(store: &TaskStore) -> Stats {
    Stats {
        total: store.len(),
        completed: store.completed().len(),
        active: store.active().len(),
        important: store.iter().filter(|t| t.important).count(),
    }
}

pub fn progress(store: &TaskStore) -> Progress {
    let Stats { total, completed, .. } = stats(store);
    let percent = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Progress {
        completed,
        total,
        percent,
        all_done: total > 0 && completed == total,
    }
}

/// Calendar days (in `tz`) that have at least one task due, from both collections.
pub fn dates_with_tasks<Tz: TimeZone>(store: &TaskStore, tz: &Tz) -> BTreeSet<NaiveDate> {
    store.iter().map(|t| local_day(t, tz)).collect()
}

/// `(id, location)` for each outdoor task in `tasks`, in order: the entries
/// a renderer should keep fresh in the weather cache.
pub fn outdoor_targets(tasks: &[&Task]) -> Vec<(TaskId, String)> {
    tasks
        .iter()
        .filter_map(|t| t.weather_location().map(|loc| (t.id, loc.to_string())))
        .collect()
}
