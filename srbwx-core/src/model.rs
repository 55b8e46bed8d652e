use std::{borrow::Cow, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A named point forecasts are requested for.
///
/// Location changes always produce a new `City`; nothing mutates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: Cow<'static, str>,
    #[serde(rename = "displayName", alias = "en")]
    pub display_name: Cow<'static, str>,
    pub lat: f64,
    pub lon: f64,
}

impl City {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        display_name: impl Into<Cow<'static, str>>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            lat,
            lon,
        }
    }

    /// Used for the static candidate table.
    pub const fn candidate(
        name: &'static str,
        display_name: &'static str,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            display_name: Cow::Borrowed(display_name),
            lat,
            lon,
        }
    }

    /// `"Niš"` or `"Beograd (Belgrade)"` when the display name differs.
    pub fn label(&self) -> String {
        if self.name == self.display_name {
            self.name.to_string()
        } else {
            format!("{} ({})", self.name, self.display_name)
        }
    }

    /// Whether the coordinates are usable for a forecast request.
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat != 0.0 && self.lon != 0.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Conditions at the time of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity_pct: f64,
    pub wind_speed_kmh: f64,
    pub pressure_hpa: f64,
    pub is_day: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    /// Wall-clock time in the requested timezone.
    pub time: NaiveDateTime,
    pub temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub max: f64,
    pub min: f64,
    pub precipitation_mm: f64,
    pub weather_code: i32,
    pub wind_max_kmh: Option<f64>,
}

/// One successful forecast fetch, tied to the city it was requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyEntry>,
    pub utc_offset_seconds: i32,
}

impl ForecastSnapshot {
    /// Min/max of the next 24 hourly temperatures, suitable for scaling a chart.
    ///
    /// A flat series gets `max = min + 1`; an empty one yields `(0, 1)`.
    pub fn next_24h_range(&self) -> (f64, f64) {
        let mut temps = self.hourly.iter().take(24).map(|p| p.temp);
        let Some(first) = temps.next() else {
            return (0.0, 1.0);
        };

        let (min, mut max) = temps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        if max == min {
            max = min + 1.0;
        }
        (min, max)
    }
}

/// Particulate readings at the most recent sampled hour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warn,
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warn => "warn",
            AlertLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HeavyRain { mm: f64 },
    StrongWind,
    Heat,
    Frost,
    Thunderstorm,
}

impl AlertKind {
    pub fn message(&self, lang: Lang) -> String {
        match (self, lang) {
            (AlertKind::HeavyRain { mm }, Lang::Sr) => {
                format!("Obilne padavine (~{} mm)", mm.round())
            }
            (AlertKind::HeavyRain { mm }, Lang::En) => {
                format!("Heavy rainfall (~{} mm)", mm.round())
            }
            (AlertKind::StrongWind, Lang::Sr) => "Pojačan vetar (≥60 km/h)".to_string(),
            (AlertKind::StrongWind, Lang::En) => "Strong wind (≥60 km/h)".to_string(),
            (AlertKind::Heat, Lang::Sr) => "Vrela temperatura (≥35°C)".to_string(),
            (AlertKind::Heat, Lang::En) => "Heat (≥35°C)".to_string(),
            (AlertKind::Frost, Lang::Sr) => "Mraz (≤0°C)".to_string(),
            (AlertKind::Frost, Lang::En) => "Frost (≤0°C)".to_string(),
            (AlertKind::Thunderstorm, Lang::Sr) => "Moguće grmljavinske oluje".to_string(),
            (AlertKind::Thunderstorm, Lang::En) => "Thunderstorm risk".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: AlertKind,
    pub message: String,
}

/// Display language, persisted under the `lang` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Sr,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Sr => "sr",
            Lang::En => "en",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Lang::Sr => Lang::En,
            Lang::En => Lang::Sr,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Lang {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "sr" => Ok(Lang::Sr),
            "en" => Ok(Lang::En),
            _ => Err(anyhow::anyhow!(
                "Unknown language '{value}'. Supported languages: sr, en."
            )),
        }
    }
}

/// Glyph for a WMO weather code.
pub fn weather_glyph(code: i32) -> &'static str {
    match code {
        0 => "☀️",
        1 => "🌤️",
        2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫️",
        51 => "🌦️",
        61 | 63 | 65 | 80 => "🌧️",
        71 => "🌨️",
        95 => "⛈️",
        _ => "🌡️",
    }
}
