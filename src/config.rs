//! Runtime configuration for the weather subsystem.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STALE_AFTER_MINS: i64 = 30;

/// Resolved weather settings shared by the HTTP client and the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Upper bound on a single fetch; expiry counts as a failure.
    pub timeout: Duration,
    /// Age after which a loaded reading is refreshed.
    pub stale_after: chrono::Duration,
    /// Age after which a failed reading is retried.
    pub retry_failed_after: chrono::Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stale_after: chrono::Duration::minutes(DEFAULT_STALE_AFTER_MINS),
            retry_failed_after: chrono::Duration::minutes(DEFAULT_STALE_AFTER_MINS),
        }
    }
}

impl WeatherConfig {
    /// Build from raw option values, rejecting nonsensical ones.
    ///
    /// `retry_failed_after_mins` defaults to the staleness threshold.
    pub fn from_parts(
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        stale_after_mins: i64,
        retry_failed_after_mins: Option<i64>,
    ) -> Result<Self, ConfigError> {
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("weather timeout must be at least 1 second".into()));
        }
        if stale_after_mins <= 0 {
            return Err(ConfigError::Invalid("staleness threshold must be positive".into()));
        }
        let retry = retry_failed_after_mins.unwrap_or(stale_after_mins);
        if retry <= 0 || retry > stale_after_mins {
            return Err(ConfigError::Invalid(format!(
                "failed-fetch retry must be between 1 and {stale_after_mins} minutes"
            )));
        }
        let endpoint = endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(format!("weather endpoint '{endpoint}' is not an http(s) URL")));
        }

        Ok(Self {
            endpoint,
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            stale_after: chrono::Duration::minutes(stale_after_mins),
            retry_failed_after: chrono::Duration::minutes(retry),
        })
    }
}
