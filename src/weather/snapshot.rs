//! Weather readings as the display layer consumes them.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// The fields of a current-weather response that the UI shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: u32,
    /// Metres per second.
    pub wind_speed: f64,
    /// Provider condition code (2xx thunderstorm .. 800 clear, 80x clouds).
    pub condition_code: u32,
    pub description: String,
}

/// Broad weather condition used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Thunderstorm,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
}

impl Condition {
    /// Single-character icon shown in front of a reading.
    pub fn glyph(self) -> &'static str {
        match self {
            Condition::Thunderstorm => "⚡",
            Condition::Rain => "☂",
            Condition::Snow => "❄",
            Condition::Atmosphere => "≋",
            Condition::Clear => "☀",
            Condition::Clouds => "☁",
        }
    }
}

/// Temperature range used to tint the weather panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    Freezing,
    Cool,
    Mild,
    Warm,
}

#[derive(Deserialize)]
struct RawResponse {
    main: RawMain,
    wind: RawWind,
    weather: Vec<RawCondition>,
}

#[derive(Deserialize)]
struct RawMain {
    temp: f64,
    humidity: u32,
}

#[derive(Deserialize)]
struct RawWind {
    speed: f64,
}

#[derive(Deserialize)]
struct RawCondition {
    id: u32,
    description: String,
}

impl WeatherSnapshot {
    /// Decode a provider response body.
    pub fn from_json(value: serde_json::Value) -> Result<Self, FetchError> {
        let raw: RawResponse =
            serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
        let condition = raw
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Decode("empty weather array".into()))?;
        Ok(WeatherSnapshot {
            temperature: raw.main.temp,
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
            condition_code: condition.id,
            description: condition.description,
        })
    }

    pub fn wind_kmh(&self) -> f64 {
        self.wind_speed * 3.6
    }

    pub fn condition(&self) -> Condition {
        match self.condition_code {
            200..=299 => Condition::Thunderstorm,
            300..=599 => Condition::Rain,
            600..=699 => Condition::Snow,
            700..=799 => Condition::Atmosphere,
            800 => Condition::Clear,
            _ => Condition::Clouds,
        }
    }

    pub fn band(&self) -> TemperatureBand {
        if self.temperature <= 0.0 {
            TemperatureBand::Freezing
        } else if self.temperature <= 15.0 {
            TemperatureBand::Cool
        } else if self.temperature <= 25.0 {
            TemperatureBand::Mild
        } else {
            TemperatureBand::Warm
        }
    }

    /// One-line summary, e.g. `18.4°C light rain, humidity 72%, wind 11.2 km/h`.
    pub fn summary(&self) -> String {
        format!(
            "{:.1}°C {}, humidity {}%, wind {:.1} km/h",
            self.temperature,
            self.description,
            self.humidity,
            self.wind_kmh()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn sample(code: u32, temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: temp,
            humidity: 50,
            wind_speed: 2.5,
            condition_code: code,
            description: "x".into(),
        }
    }

    #[rstest]
    fn decodes_provider_body() {
        let body = json!({
            "name": "Paris",
            "main": { "temp": 18.4, "humidity": 72, "pressure": 1012 },
            "wind": { "speed": 3.1, "deg": 200 },
            "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }]
        });
        let snap = WeatherSnapshot::from_json(body).unwrap();
        assert_eq!(snap.temperature, 18.4);
        assert_eq!(snap.humidity, 72);
        assert_eq!(snap.condition_code, 500);
        assert_eq!(snap.description, "light rain");
        assert_eq!(snap.condition(), Condition::Rain);
    }

    #[rstest]
    fn missing_fields_are_decode_errors() {
        let body = json!({ "main": { "temp": 1.0 }, "weather": [] });
        assert!(matches!(
            WeatherSnapshot::from_json(body),
            Err(FetchError::Decode(_))
        ));
    }

    #[rstest]
    fn empty_condition_list_is_rejected() {
        let body = json!({
            "main": { "temp": 1.0, "humidity": 10 },
            "wind": { "speed": 0.0 },
            "weather": []
        });
        assert!(matches!(
            WeatherSnapshot::from_json(body),
            Err(FetchError::Decode(msg)) if msg.contains("empty")
        ));
    }

    #[rstest]
    fn wind_is_converted_to_kmh() {
        let snap = sample(800, 20.0);
        assert!((snap.wind_kmh() - 9.0).abs() < 1e-9);
        assert_eq!(snap.summary(), "20.0°C x, humidity 50%, wind 9.0 km/h");
    }

    #[rstest]
    #[case(211, Condition::Thunderstorm)]
    #[case(301, Condition::Rain)]
    #[case(522, Condition::Rain)]
    #[case(601, Condition::Snow)]
    #[case(741, Condition::Atmosphere)]
    #[case(800, Condition::Clear)]
    #[case(803, Condition::Clouds)]
    fn condition_categories(#[case] code: u32, #[case] expected: Condition) {
        assert_eq!(sample(code, 10.0).condition(), expected);
    }

    #[rstest]
    #[case(-3.0, TemperatureBand::Freezing)]
    #[case(0.0, TemperatureBand::Freezing)]
    #[case(15.0, TemperatureBand::Cool)]
    #[case(22.5, TemperatureBand::Mild)]
    #[case(31.0, TemperatureBand::Warm)]
    fn temperature_bands(#[case] temp: f64, #[case] expected: TemperatureBand) {
        assert_eq!(sample(800, temp).band(), expected);
    }
}
