//! Weather enrichment for outdoor tasks.

pub mod cache;
pub mod provider;
pub mod snapshot;

pub use cache::{RefreshPolicy, WeatherCache, WeatherEntry, WeatherState};
pub use provider::{OpenWeatherClient, WeatherProvider};
pub use snapshot::{Condition, TemperatureBand, WeatherSnapshot};
