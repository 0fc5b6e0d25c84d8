//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Priority;
use crate::weather::TemperatureBand;

/// Header and status bar background
pub const BRAND: Color = Color::Rgb(0, 80, 0);
/// Focused field borders and the important star
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Destructive confirmations and failed weather
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Progress gauge
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

pub fn temperature_color(band: TemperatureBand) -> Color {
    match band {
        TemperatureBand::Freezing => Color::LightBlue,
        TemperatureBand::Cool => Color::Cyan,
        TemperatureBand::Mild => Color::Green,
        TemperatureBand::Warm => Color::LightRed,
    }
}
