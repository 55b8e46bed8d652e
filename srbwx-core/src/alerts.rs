//! Rule-based alerts derived from the daily forecast.

use crate::model::{Alert, AlertKind, AlertLevel, DailyEntry, Lang};

/// Only today and the next two days are inspected.
pub const ALERT_WINDOW_DAYS: usize = 3;

pub const HEAVY_RAIN_MM: f64 = 15.0;
pub const STRONG_WIND_KMH: f64 = 60.0;
pub const HEAT_C: f64 = 35.0;
pub const FROST_C: f64 = 0.0;
pub const THUNDERSTORM_CODE: i32 = 95;

type Rule = fn(&DailyEntry) -> Option<(AlertLevel, AlertKind)>;

/// Evaluated in this order for every day.
static RULES: [Rule; 5] = [heavy_rain, strong_wind, heat, frost, thunderstorm];

fn heavy_rain(d: &DailyEntry) -> Option<(AlertLevel, AlertKind)> {
    let kind = AlertKind::HeavyRain {
        mm: d.precipitation_mm,
    };
    (d.precipitation_mm >= HEAVY_RAIN_MM).then_some((AlertLevel::Warn, kind))
}

fn strong_wind(d: &DailyEntry) -> Option<(AlertLevel, AlertKind)> {
    let wind = d.wind_max_kmh.unwrap_or(0.0);
    (wind >= STRONG_WIND_KMH).then_some((AlertLevel::Warn, AlertKind::StrongWind))
}

fn heat(d: &DailyEntry) -> Option<(AlertLevel, AlertKind)> {
    (d.max >= HEAT_C).then_some((AlertLevel::Danger, AlertKind::Heat))
}

fn frost(d: &DailyEntry) -> Option<(AlertLevel, AlertKind)> {
    (d.min <= FROST_C).then_some((AlertLevel::Info, AlertKind::Frost))
}

fn thunderstorm(d: &DailyEntry) -> Option<(AlertLevel, AlertKind)> {
    let stormy = d.weather_code == THUNDERSTORM_CODE;
    stormy.then_some((AlertLevel::Warn, AlertKind::Thunderstorm))
}

/// Alerts for the first [`ALERT_WINDOW_DAYS`] days, day-major then rule order.
///
/// Rules are independent, so one day may produce several alerts and the same
/// alert may repeat on different days.
pub fn derive_alerts(daily: &[DailyEntry], lang: Lang) -> Vec<Alert> {
    daily
        .iter()
        .take(ALERT_WINDOW_DAYS)
        .flat_map(|day| RULES.iter().filter_map(move |rule| rule(day)))
        .map(|(level, kind)| Alert {
            level,
            kind,
            message: kind.message(lang),
        })
        .collect()
}
