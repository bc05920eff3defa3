//! Weather lookup
//!
//! `GET {base}/weather?lat=..&lon=..` returns current conditions plus hourly
//! and daily forecasts. Reports are cached per location for a fixed TTL.

mod cache;

pub use cache::{cached_weather, WeatherCache};

use crate::diagnosis::error_detail;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location used when the caller supplies none
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    lat: -10.6,
    lon: 34.117,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location: String,
    /// Celsius
    pub temp: f64,
    pub condition: String,
    /// Percent
    pub humidity: f64,
    /// km/h
    pub wind: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: String,
    pub temp: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub day: String,
    pub temp: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("Weather service returned {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("Weather request failed: {0}")]
    Network(String),
    #[error("Malformed weather response: {0}")]
    Malformed(String),
}

/// Source of weather reports
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, coords: Coordinates) -> Result<WeatherReport, WeatherError>;
}

/// Weather service reached over HTTP
pub struct WeatherClient {
    client: Client,
    weather_url: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            weather_url: format!("{}/weather", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch(&self, coords: Coordinates) -> Result<WeatherReport, WeatherError> {
        let response = self
            .client
            .get(&self.weather_url)
            .query(&[("lat", coords.lat), ("lon", coords.lon)])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(WeatherError::Service {
                status: status.as_u16(),
                detail: error_detail(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Malformed(e.to_string()))
    }
}
