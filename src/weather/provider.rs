//! Source of weather readings.
//!
//! `WeatherProvider` is the seam the cache fetches through; `OpenWeatherClient`
//! is the HTTP implementation against an OpenWeatherMap-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::WeatherConfig;
use crate::error::FetchError;
use crate::weather::snapshot::WeatherSnapshot;

/// Fetches the current weather for a free-text location.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError>;

    /// Name used in log events.
    fn name(&self) -> &'static str {
        "weather"
    }
}

/// `GET <endpoint>?q=<location>&units=metric&appid=<key>`.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        }
    }

    fn request(&self, location: &str, api_key: &str) -> reqwest::RequestBuilder {
        self.client
            .get(&self.endpoint)
            .query(&[("q", location), ("units", "metric"), ("appid", api_key)])
            .timeout(self.timeout)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(FetchError::NotConfigured("no API key set".into()));
        };
        let timeout_ms = self.timeout.as_millis() as u64;

        let response = self
            .request(location, api_key)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    FetchError::Timeout(timeout_ms)
                } else {
                    FetchError::Transport(error.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|error| FetchError::Decode(error.to_string()))?;
        WeatherSnapshot::from_json(body)
    }

    fn name(&self) -> &'static str {
        "openweathermap"
    }
}
