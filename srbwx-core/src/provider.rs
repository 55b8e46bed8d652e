use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::SourceError,
    model::{AirQualitySnapshot, City, ForecastSnapshot},
};

pub mod open_meteo;

pub use open_meteo::OpenMeteoSource;

/// Where forecasts and air-quality readings come from.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn forecast(&self, city: &City) -> Result<ForecastSnapshot, SourceError>;

    /// `Ok(None)` when the service has no usable readings for `city`.
    async fn air_quality(&self, city: &City) -> Result<Option<AirQualitySnapshot>, SourceError>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
