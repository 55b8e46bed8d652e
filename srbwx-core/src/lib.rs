//! Core library for the `srbwx` CLI.
//!
//! This crate defines:
//! - The fixed list of Serbian cities and nearest-city lookup
//! - Forecast and air-quality fetching with cancellation across city changes
//! - Weather alerts derived from the daily forecast
//! - Slippy-map tile math and the static map fallback
//! - Persisted preferences and on-disk configuration
//!
//! It is used by `srbwx-cli`, but has no terminal I/O of its own.

pub mod alerts;
pub mod cities;
pub mod config;
pub mod error;
pub mod geo;
pub mod locate;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod startup;
pub mod store;
pub mod tiles;

pub use alerts::derive_alerts;
pub use cities::{CANDIDATE_CITIES, find_city, search_cities};
pub use config::Config;
pub use error::{FetchError, SourceError, StoreError};
pub use geo::{GeoErrorKind, NearestCity, classify_geo_error, nearest_city};
pub use locate::{GeoOptions, Geolocator, use_my_location};
pub use model::{AirQualitySnapshot, Alert, AlertLevel, City, DailyEntry, ForecastSnapshot, Lang};
pub use orchestrator::{FetchStatus, ForecastOrchestrator, ForecastReport, ViewState};
pub use provider::{OpenMeteoSource, WeatherSource};
pub use store::Preferences;
pub use tiles::{MapMount, MapState, MapView, lat_lon_to_tile};
