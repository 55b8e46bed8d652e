//! Nearest-city resolution and geolocation failure classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cities::CANDIDATE_CITIES, model::City};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NearestCity {
    pub nearest: City,
    pub distance_km: f64,
}

/// Great-circle distance between two points given in decimal degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Closest candidate city to `(lat, lon)`.
///
/// Exact ties go to the candidate declared first in [`CANDIDATE_CITIES`].
/// That is an artifact of list order, not a geodesic preference.
pub fn nearest_city(lat: f64, lon: f64) -> NearestCity {
    nearest_in(&CANDIDATE_CITIES, lat, lon)
}

fn nearest_in(candidates: &[City], lat: f64, lon: f64) -> NearestCity {
    let mut best = &candidates[0];
    let mut best_d = f64::INFINITY;

    for c in candidates {
        let d = haversine_km(lat, lon, c.lat, c.lon);
        // strict: first minimum wins
        if d < best_d {
            best_d = d;
            best = c;
        }
    }

    NearestCity {
        nearest: best.clone(),
        distance_km: best_d,
    }
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
pub enum GeoErrorKind {
    #[error("location permission denied")]
    Denied,
    #[error("location currently unavailable")]
    Unavailable,
    #[error("timed out while locating")]
    Timeout,
    #[error("geolocation requires a secure context")]
    InsecureContext,
    #[error("geolocation is not supported")]
    Unsupported,
}

impl GeoErrorKind {
    /// Localized text for display.
    pub fn message(&self, lang: crate::Lang) -> &'static str {
        use crate::Lang::{En, Sr};
        match (self, lang) {
            (GeoErrorKind::Denied, Sr) => "Pristup lokaciji odbijen.",
            (GeoErrorKind::Denied, En) => "Location permission denied.",
            (GeoErrorKind::Unavailable, Sr) => "Lokacija trenutno nije dostupna.",
            (GeoErrorKind::Unavailable, En) => "Location currently unavailable.",
            (GeoErrorKind::Timeout, Sr) => "Vreme za određivanje lokacije je isteklo.",
            (GeoErrorKind::Timeout, En) => "Timed out while locating.",
            (GeoErrorKind::InsecureContext, Sr) => "Geolokacija zahteva HTTPS.",
            (GeoErrorKind::InsecureContext, En) => "Geolocation requires HTTPS.",
            (GeoErrorKind::Unsupported, Sr) => "Pregledač ne podržava geolokaciju.",
            (GeoErrorKind::Unsupported, En) => "Geolocation is not supported on this device.",
        }
    }
}

/// A failure reported by the geolocation capability.
///
/// Codes: 1 = permission denied, 2 = position unavailable, 3 = timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawGeoError {
    pub code: Option<u16>,
}

impl RawGeoError {
    pub const PERMISSION_DENIED: Self = Self { code: Some(1) };
    pub const POSITION_UNAVAILABLE: Self = Self { code: Some(2) };
    pub const TIMEOUT: Self = Self { code: Some(3) };
}

/// Ambient facts about the environment the request ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoContext {
    pub is_secure_context: bool,
    pub has_geolocation_capability: bool,
}

impl Default for GeoContext {
    fn default() -> Self {
        Self {
            is_secure_context: true,
            has_geolocation_capability: true,
        }
    }
}

pub fn classify_geo_error(raw: RawGeoError, ctx: GeoContext) -> GeoErrorKind {
    match raw.code {
        Some(1) => GeoErrorKind::Denied,
        Some(2) => GeoErrorKind::Unavailable,
        Some(3) => GeoErrorKind::Timeout,
        _ if !ctx.is_secure_context => GeoErrorKind::InsecureContext,
        _ if !ctx.has_geolocation_capability => GeoErrorKind::Unsupported,
        _ => GeoErrorKind::Unavailable,
    }
}
