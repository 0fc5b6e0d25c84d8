use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::{WeatherConfig, DEFAULT_STALE_AFTER_MINS, DEFAULT_TIMEOUT_SECS};
use crate::error::ConfigError;

/// In-memory task list with live weather for outdoor plans.
/// Nothing is saved: tasks live until logout or exit.
#[derive(Parser)]
#[command(name = "tw", version, about = "Daily tasks with weather for outdoor plans")]
pub struct Cli {
    /// OpenWeatherMap API key.
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Current-weather endpoint.
    #[arg(long, global = true, env = "WEATHER_ENDPOINT")]
    pub weather_endpoint: Option<String>,

    /// Seconds before a weather request is abandoned.
    #[arg(long, global = true, env = "WEATHER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub weather_timeout_secs: u64,

    /// Minutes before a weather reading is refreshed.
    #[arg(long, global = true, env = "WEATHER_STALE_AFTER_MINS", default_value_t = DEFAULT_STALE_AFTER_MINS)]
    pub stale_after_mins: i64,

    /// Minutes before a failed weather lookup is retried (defaults to the refresh interval).
    #[arg(long, global = true, env = "WEATHER_RETRY_FAILED_AFTER_MINS")]
    pub retry_failed_after_mins: Option<i64>,

    /// Log level: error | warn | info | debug | trace.
    #[arg(long, global = true, env = "TW_LOG", default_value = "warn")]
    pub log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn weather_config(&self) -> Result<WeatherConfig, ConfigError> {
        WeatherConfig::from_parts(
            self.weather_endpoint.clone(),
            self.api_key.clone(),
            self.weather_timeout_secs,
            self.stale_after_mins,
            self.retry_failed_after_mins,
        )
    }
}
