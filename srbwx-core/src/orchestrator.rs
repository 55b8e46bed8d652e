//! Forecast fetching tied to the currently selected city.
//!
//! Each selection starts a new fetch group and cancels the previous one.
//! Only the newest group may publish results; anything a superseded group
//! produces is dropped without surfacing an error.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    alerts::derive_alerts,
    error::FetchError,
    model::{AirQualitySnapshot, Alert, City, ForecastSnapshot, Lang},
    provider::WeatherSource,
    store::Preferences,
};

pub const AIR_QUALITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a fetch group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound on the air-quality request, so it cannot hold back the forecast.
    pub air_quality_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            air_quality_timeout: AIR_QUALITY_TIMEOUT,
        }
    }
}

/// Output of one successful fetch group.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBundle {
    pub forecast: ForecastSnapshot,
    pub air_quality: Option<AirQualitySnapshot>,
}

/// Everything the presentation layer needs for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    pub city: City,
    pub forecast: ForecastSnapshot,
    pub air_quality: Option<AirQualitySnapshot>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    /// Nothing requested yet.
    Idle,
    Loading,
    Ready(Arc<ForecastReport>),
    Failed(FetchError),
}

/// Committed, user-visible state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub city: City,
    /// Fetch group that owns this state; 0 before the first selection.
    pub generation: u64,
    pub status: FetchStatus,
}

/// Fetch forecast and air quality for `city` concurrently.
///
/// Air-quality failures, including running past `options.air_quality_timeout`,
/// degrade to `None`. If `token` is cancelled first the result is
/// [`FetchError::Cancelled`] and in-flight requests are dropped.
pub async fn resolve_forecast(
    source: &dyn WeatherSource,
    city: &City,
    token: &CancellationToken,
    options: FetchOptions,
) -> Result<ForecastBundle, FetchError> {
    let work = async {
        let air = tokio::time::timeout(options.air_quality_timeout, source.air_quality(city));
        let (forecast, air) = tokio::join!(source.forecast(city), air);

        let forecast = forecast.map_err(|e| e.into_fetch_error(&city.name))?;
        let air_quality = match air {
            Ok(Ok(aq)) => aq,
            Ok(Err(e)) => {
                tracing::warn!(city = %city, error = %e, "air quality unavailable");
                None
            }
            Err(_) => {
                tracing::warn!(city = %city, "air quality timed out");
                None
            }
        };

        Ok::<_, FetchError>(ForecastBundle {
            forecast,
            air_quality,
        })
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(FetchError::Cancelled),
        res = work => res,
    }
}

#[derive(Debug)]
struct ActiveGroup {
    generation: u64,
    token: CancellationToken,
}

/// Lock order: `active` before `lang`.
#[derive(Debug)]
struct Inner {
    source: Arc<dyn WeatherSource>,
    prefs: Preferences,
    options: FetchOptions,
    lang: Mutex<Lang>,
    active: Mutex<Option<ActiveGroup>>,
    next_generation: AtomicU64,
    state: watch::Sender<ViewState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// Publish `result` if `generation` is still the active group.
    fn commit(&self, generation: u64, city: &City, result: Result<ForecastBundle, FetchError>) {
        let active = lock(&self.active);
        let current = active
            .as_ref()
            .filter(|g| !g.token.is_cancelled())
            .map(|g| g.generation);
        if current != Some(generation) {
            tracing::debug!(generation, city = %city, "dropping result of superseded fetch");
            return;
        }

        let status = match result {
            Ok(bundle) => {
                let alerts = derive_alerts(&bundle.forecast.daily, *lock(&self.lang));
                tracing::info!(city = %city, alerts = alerts.len(), "forecast ready");
                FetchStatus::Ready(Arc::new(ForecastReport {
                    city: city.clone(),
                    forecast: bundle.forecast,
                    air_quality: bundle.air_quality,
                    alerts,
                }))
            }
            Err(FetchError::Cancelled) => return,
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "forecast fetch failed");
                FetchStatus::Failed(e)
            }
        };

        self.state.send_replace(ViewState {
            city: city.clone(),
            generation,
            status,
        });
    }
}

/// Owns the single active fetch group and the committed [`ViewState`].
#[derive(Debug, Clone)]
pub struct ForecastOrchestrator {
    inner: Arc<Inner>,
}

impl ForecastOrchestrator {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        prefs: Preferences,
        initial: City,
        lang: Lang,
    ) -> Self {
        Self::with_options(source, prefs, initial, lang, FetchOptions::default())
    }

    pub fn with_options(
        source: Arc<dyn WeatherSource>,
        prefs: Preferences,
        initial: City,
        lang: Lang,
        options: FetchOptions,
    ) -> Self {
        let (state, _) = watch::channel(ViewState {
            city: initial,
            generation: 0,
            status: FetchStatus::Idle,
        });

        Self {
            inner: Arc::new(Inner {
                source,
                prefs,
                options,
                lang: Mutex::new(lang),
                active: Mutex::new(None),
                next_generation: AtomicU64::new(1),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn city(&self) -> City {
        self.inner.state.borrow().city.clone()
    }

    /// Make `city` current and start fetching it.
    ///
    /// The city is persisted before any request is made. A pending group for
    /// an earlier city is cancelled and can no longer publish.
    pub fn select(&self, city: City) -> JoinHandle<()> {
        self.inner.prefs.save_last_city(&city);

        let token = CancellationToken::new();
        let generation = {
            let mut active = lock(&self.inner.active);
            if let Some(prev) = active.take() {
                tracing::debug!(generation = prev.generation, "cancelling previous fetch");
                prev.token.cancel();
            }
            let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
            *active = Some(ActiveGroup {
                generation,
                token: token.clone(),
            });

            // Published under the lock so a concurrent selection cannot
            // interleave its own `Loading` or commit between these steps.
            self.inner.state.send_replace(ViewState {
                city: city.clone(),
                generation,
                status: FetchStatus::Loading,
            });
            generation
        };

        tracing::debug!(generation, city = %city, "starting fetch");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let source = inner.source.as_ref();
            let result = resolve_forecast(source, &city, &token, inner.options).await;
            inner.commit(generation, &city, result);
        })
    }

    /// [`Self::select`], then wait for that group to settle.
    pub async fn select_and_wait(&self, city: City) -> ViewState {
        if let Err(e) = self.select(city).await {
            tracing::warn!(error = %e, "fetch task did not complete");
        }
        self.state()
    }

    /// Cancel the active group, if any, leaving state as it is.
    pub fn cancel(&self) {
        if let Some(g) = lock(&self.inner.active).take() {
            g.token.cancel();
        }
    }

    /// Switch alert language, re-deriving alerts of a ready report.
    pub fn set_lang(&self, lang: Lang) {
        {
            let _active = lock(&self.inner.active);
            *lock(&self.inner.lang) = lang;

            self.inner.state.send_if_modified(|s| match &mut s.status {
                FetchStatus::Ready(report) => {
                    let alerts = derive_alerts(&report.forecast.daily, lang);
                    Arc::make_mut(report).alerts = alerts;
                    true
                }
                _ => false,
            });
        }

        self.inner.prefs.set_lang(lang);
    }
}
