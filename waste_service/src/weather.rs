//! Weather enrichment client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use kitchen_data::WeatherObservation;

/// Weather lookup failure. The service always recovers from this with
/// fixed default conditions; it is never surfaced to a caller.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Transport, timeout, or decoding failure from the HTTP client
    #[error("weather transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The source is unreachable or declined the lookup
    #[error("weather lookup unavailable: {0}")]
    Unavailable(String),
}

/// Source of current weather observations.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Look up the current weather for a city.
    async fn current(&self, city: &str) -> Result<WeatherObservation, WeatherError>;
}

/// Client for a weatherapi.com-style current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temp_c: f64,
    humidity: f64,
}

impl WeatherApiClient {
    /// Lookup timeout; a slow source degrades the prediction, it must not
    /// stall the request indefinitely.
    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a client for the given endpoint and API key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn current(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
            .send()
            .await?
            .error_for_status()?;

        let conditions: CurrentConditions = response.json().await?;
        Ok(WeatherObservation {
            temperature_c: conditions.current.temp_c,
            humidity_percent: conditions.current.humidity,
        })
    }
}
