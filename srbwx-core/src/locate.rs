//! Device geolocation, wrapped as a single awaitable request.
//!
//! The request has its own timeout and is independent of forecast
//! cancellation.

use std::{
    fmt::Debug,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;

use crate::{
    geo::{GeoContext, GeoErrorKind, RawGeoError, classify_geo_error, nearest_city},
    model::{City, Lang},
    store::{GeoStatus, Preferences},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached position that may be returned instead of a fresh fix.
    pub max_age: Duration,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(10_000),
            max_age: Duration::from_millis(600_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

/// A source of device positions.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    fn context(&self) -> GeoContext;

    /// Permission check. `None` when the platform cannot report it.
    async fn permission(&self) -> Option<PermissionState> {
        None
    }

    async fn current_position(&self, options: &GeoOptions) -> Result<Position, RawGeoError>;
}

/// Geolocator for a known fixed position, or none at all.
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    position: Option<Position>,
}

impl FixedGeolocator {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            position: Some(Position {
                lat,
                lon,
                accuracy_m: None,
            }),
        }
    }

    pub fn unsupported() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    fn context(&self) -> GeoContext {
        GeoContext {
            is_secure_context: true,
            has_geolocation_capability: self.position.is_some(),
        }
    }

    async fn current_position(&self, _options: &GeoOptions) -> Result<Position, RawGeoError> {
        self.position.ok_or(RawGeoError::POSITION_UNAVAILABLE)
    }
}

/// Reuses the last fix while it is younger than `max_age`.
#[derive(Debug)]
pub struct CachedGeolocator<G> {
    inner: G,
    last: Mutex<Option<(Instant, Position)>>,
}

impl<G: Geolocator> CachedGeolocator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    fn cached(&self, max_age: Duration) -> Option<Position> {
        let last = self.last.lock().ok()?;
        last.filter(|(at, _)| at.elapsed() <= max_age)
            .map(|(_, p)| p)
    }
}

#[async_trait]
impl<G: Geolocator> Geolocator for CachedGeolocator<G> {
    fn context(&self) -> GeoContext {
        self.inner.context()
    }

    async fn permission(&self) -> Option<PermissionState> {
        self.inner.permission().await
    }

    async fn current_position(&self, options: &GeoOptions) -> Result<Position, RawGeoError> {
        if let Some(p) = self.cached(options.max_age) {
            tracing::debug!("reusing cached position");
            return Ok(p);
        }

        let p = self.inner.current_position(options).await?;
        if let Ok(mut last) = self.last.lock() {
            *last = Some((Instant::now(), p));
        }
        Ok(p)
    }
}

/// One-shot position request bounded by `options.timeout`.
pub async fn request_position(
    geo: &dyn Geolocator,
    options: &GeoOptions,
) -> Result<Position, GeoErrorKind> {
    let ctx = geo.context();

    match tokio::time::timeout(options.timeout, geo.current_position(options)).await {
        Ok(Ok(p)) => Ok(p),
        Ok(Err(raw)) => Err(classify_geo_error(raw, ctx)),
        Err(_) => Err(GeoErrorKind::Timeout),
    }
}

/// The city created for a device position.
pub fn city_for_position(position: &Position, lang: Lang) -> City {
    let label = match lang {
        Lang::Sr => "Moja lokacija",
        Lang::En => "My Location",
    };
    let nearest = nearest_city(position.lat, position.lon).nearest;

    let name = format!("{label} • {}", nearest.name);

    City::new(name, label, position.lat, position.lon)
}

/// Locate the device and turn the fix into a new [`City`].
///
/// A `denied` outcome, whether from the permission check or the request
/// itself, is remembered so later startups skip the automatic attempt.
pub async fn use_my_location(
    geo: &dyn Geolocator,
    prefs: &Preferences,
    lang: Lang,
    options: &GeoOptions,
) -> Result<City, GeoErrorKind> {
    let ctx = geo.context();
    if !ctx.is_secure_context {
        return Err(GeoErrorKind::InsecureContext);
    }
    if !ctx.has_geolocation_capability {
        return Err(GeoErrorKind::Unsupported);
    }

    if geo.permission().await == Some(PermissionState::Denied) {
        tracing::info!("geolocation permission already denied");
        prefs.set_geo_status(GeoStatus::Denied);
        return Err(GeoErrorKind::Denied);
    }

    match request_position(geo, options).await {
        Ok(position) => {
            let city = city_for_position(&position, lang);
            tracing::info!(city = %city, "located device");
            prefs.set_geo_status(GeoStatus::Granted);
            Ok(city)
        }
        Err(kind) => {
            tracing::info!(error = %kind, "geolocation failed");
            if kind == GeoErrorKind::Denied {
                prefs.set_geo_status(GeoStatus::Denied);
            }
            Err(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct ScriptedGeolocator {
        permission: Option<PermissionState>,
        outcome: Option<Result<Position, RawGeoError>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geolocator for ScriptedGeolocator {
        fn context(&self) -> GeoContext {
            GeoContext::default()
        }

        async fn permission(&self) -> Option<PermissionState> {
            self.permission
        }

        async fn current_position(&self, _options: &GeoOptions) -> Result<Position, RawGeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.unwrap_or(Err(RawGeoError::default()))
        }
    }

    fn pos(lat: f64, lon: f64) -> Position {
        Position {
            lat,
            lon,
            accuracy_m: Some(25.0),
        }
    }

    #[test]
    fn default_options_match_platform_request() {
        let o = GeoOptions::default();
        assert!(o.high_accuracy);
        assert_eq!(o.timeout, Duration::from_secs(10));
        assert_eq!(o.max_age, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn success_builds_city_and_remembers_grant() {
        let geo = ScriptedGeolocator {
            outcome: Some(Ok(pos(43.33, 21.9))),
            ..Default::default()
        };
        let prefs = Preferences::in_memory();

        let city = use_my_location(&geo, &prefs, Lang::En, &GeoOptions::default())
            .await
            .expect("position available");

        assert_eq!(city.name, "My Location • Niš");
        assert_eq!(city.display_name, "My Location");
        assert_eq!((city.lat, city.lon), (43.33, 21.9));
        assert_eq!(prefs.geo_status(), Some(GeoStatus::Granted));
    }

    #[tokio::test]
    async fn denied_permission_skips_position_request() {
        let geo = ScriptedGeolocator {
            permission: Some(PermissionState::Denied),
            outcome: Some(Ok(pos(44.0, 20.0))),
            ..Default::default()
        };
        let prefs = Preferences::in_memory();

        let err = use_my_location(&geo, &prefs, Lang::Sr, &GeoOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, GeoErrorKind::Denied);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prefs.geo_status(), Some(GeoStatus::Denied));
    }

    #[tokio::test]
    async fn coded_denial_is_remembered() {
        let geo = ScriptedGeolocator {
            outcome: Some(Err(RawGeoError::PERMISSION_DENIED)),
            ..Default::default()
        };
        let prefs = Preferences::in_memory();

        let err = use_my_location(&geo, &prefs, Lang::Sr, &GeoOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, GeoErrorKind::Denied);
        assert_eq!(prefs.geo_status(), Some(GeoStatus::Denied));
    }

    #[tokio::test]
    async fn unavailable_is_not_remembered_as_denied() {
        let geo = ScriptedGeolocator {
            outcome: Some(Err(RawGeoError::POSITION_UNAVAILABLE)),
            ..Default::default()
        };
        let prefs = Preferences::in_memory();

        let err = use_my_location(&geo, &prefs, Lang::Sr, &GeoOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, GeoErrorKind::Unavailable);
        assert_eq!(prefs.geo_status(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fix_times_out() {
        let geo = ScriptedGeolocator {
            outcome: Some(Ok(pos(44.0, 20.0))),
            delay: Duration::from_secs(30),
            ..Default::default()
        };

        let err = request_position(&geo, &GeoOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, GeoErrorKind::Timeout);
    }

    #[tokio::test]
    async fn missing_capability_is_unsupported() {
        let prefs = Preferences::in_memory();
        let geo = FixedGeolocator::unsupported();
        let err = use_my_location(&geo, &prefs, Lang::En, &GeoOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, GeoErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn cached_geolocator_reuses_recent_fix() {
        let geo = CachedGeolocator::new(ScriptedGeolocator {
            outcome: Some(Ok(pos(45.0, 19.8))),
            ..Default::default()
        });
        let options = GeoOptions::default();

        let first = geo.current_position(&options).await.expect("first fix");
        let second = geo.current_position(&options).await.expect("cached fix");

        assert_eq!(first, second);
        assert_eq!(geo.inner.calls.load(Ordering::SeqCst), 1);

        let fresh = GeoOptions {
            max_age: Duration::ZERO,
            ..options
        };
        tokio::time::sleep(Duration::from_millis(2)).await;
        geo.current_position(&fresh).await.expect("fresh fix");
        assert_eq!(geo.inner.calls.load(Ordering::SeqCst), 2);
    }
}
