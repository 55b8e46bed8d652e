//! Startup lifecycle: process-wide one-time setup and the choice of the
//! first city to show.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::{
    cities::default_city,
    model::City,
    store::{GeoStatus, Preferences},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InitState {
    Pending = 0,
    Done = 1,
}

/// Guard for setup that must happen at most once per process.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(InitState::Pending as u8),
        }
    }

    pub fn state(&self) -> InitState {
        match self.state.load(Ordering::Acquire) {
            0 => InitState::Pending,
            _ => InitState::Done,
        }
    }

    /// Run `f` if this is the first call. Returns whether `f` ran.
    pub fn run_once(&self, f: impl FnOnce()) -> bool {
        let claimed = self
            .state
            .compare_exchange(
                InitState::Pending as u8,
                InitState::Done as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if claimed {
            f();
        }
        claimed
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// The city to show first: the saved selection, else the default city.
pub fn initial_city(prefs: &Preferences) -> City {
    prefs
        .last_city()
        .filter(City::has_coordinates)
        .unwrap_or_else(default_city)
}

/// Whether to try geolocation on startup.
///
/// Only when there is no saved city and the user has not denied access before.
pub fn should_auto_locate(prefs: &Preferences) -> bool {
    let has_saved = prefs.last_city().is_some_and(|c| c.has_coordinates());
    !has_saved && prefs.geo_status() != Some(GeoStatus::Denied)
}
