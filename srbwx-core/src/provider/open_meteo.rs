use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::Config,
    error::SourceError,
    model::{AirQualitySnapshot, City, CurrentConditions, DailyEntry, ForecastSnapshot, HourlyPoint},
};

use super::{WeatherSource, truncate_body};

const CURRENT_FIELDS: [&str; 6] = [
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "wind_speed_10m",
    "surface_pressure",
    "is_day",
];
const HOURLY_FIELDS: [&str; 1] = ["temperature_2m"];
const DAILY_FIELDS: [&str; 5] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "weathercode",
    "wind_speed_10m_max",
];
const AIR_QUALITY_FIELDS: [&str; 2] = ["pm10", "pm2_5"];

const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Forecast and air-quality source backed by the Open-Meteo APIs.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: Client,
    forecast_url: String,
    air_quality_url: String,
    timezone: String,
}

impl OpenMeteoSource {
    pub fn new(
        forecast_url: impl Into<String>,
        air_quality_url: impl Into<String>,
        timezone: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            forecast_url: forecast_url.into(),
            air_quality_url: air_quality_url.into(),
            timezone: timezone.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(
            &config.forecast_url,
            &config.air_quality_url,
            &config.timezone,
            config.request_timeout(),
        )
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    surface_pressure: f64,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    weathercode: Vec<Option<i32>>,
    #[serde(default)]
    wind_speed_10m_max: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: OmCurrent,
    hourly: OmHourly,
    daily: OmDaily,
}

#[derive(Debug, Deserialize)]
struct OmAirHourly {
    time: Vec<String>,
    #[serde(default)]
    pm10: Vec<Option<f64>>,
    #[serde(default)]
    pm2_5: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmAirResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<OmAirHourly>,
}

fn payload(msg: impl Into<String>) -> SourceError {
    SourceError::Payload(msg.into())
}

fn ensure_len(field: &str, actual: usize, expected: usize) -> Result<(), SourceError> {
    if actual == expected {
        Ok(())
    } else {
        Err(payload(format!(
            "{field} has {actual} entries, expected {expected}"
        )))
    }
}

fn parse_hourly_time(s: &str) -> Result<NaiveDateTime, SourceError> {
    NaiveDateTime::parse_from_str(s, HOURLY_TIME_FORMAT)
        .map_err(|e| payload(format!("bad hourly time '{s}': {e}")))
}

fn required<T: Copy>(field: &str, values: &[Option<T>], i: usize) -> Result<T, SourceError> {
    values[i].ok_or_else(|| payload(format!("{field}[{i}] is null")))
}

impl OmForecastResponse {
    fn into_snapshot(self) -> Result<ForecastSnapshot, SourceError> {
        let h = self.hourly;
        ensure_len(
            "hourly.temperature_2m",
            h.temperature_2m.len(),
            h.time.len(),
        )?;

        let mut hourly = Vec::with_capacity(h.time.len());
        for (time, temp) in h.time.iter().zip(&h.temperature_2m) {
            let time = parse_hourly_time(time)?;
            // Trailing hours past the model horizon come back as null.
            if let Some(temp) = *temp {
                hourly.push(HourlyPoint { time, temp });
            }
        }

        let d = self.daily;
        let n = d.time.len();
        ensure_len("daily.temperature_2m_max", d.temperature_2m_max.len(), n)?;
        ensure_len("daily.temperature_2m_min", d.temperature_2m_min.len(), n)?;
        ensure_len("daily.precipitation_sum", d.precipitation_sum.len(), n)?;
        ensure_len("daily.weathercode", d.weathercode.len(), n)?;
        if let Some(wind) = &d.wind_speed_10m_max {
            ensure_len("daily.wind_speed_10m_max", wind.len(), n)?;
        }

        let mut daily = Vec::with_capacity(n);
        for (i, date) in d.time.iter().enumerate() {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| payload(format!("bad daily date '{date}': {e}")))?;

            daily.push(DailyEntry {
                date,
                max: required("daily.temperature_2m_max", &d.temperature_2m_max, i)?,
                min: required("daily.temperature_2m_min", &d.temperature_2m_min, i)?,
                precipitation_mm: required("daily.precipitation_sum", &d.precipitation_sum, i)?,
                weather_code: required("daily.weathercode", &d.weathercode, i)?,
                wind_max_kmh: d.wind_speed_10m_max.as_ref().and_then(|w| w[i]),
            });
        }

        let c = self.current;
        Ok(ForecastSnapshot {
            current: CurrentConditions {
                temp: c.temperature_2m,
                feels_like: c.apparent_temperature,
                humidity_pct: c.relative_humidity_2m,
                wind_speed_kmh: c.wind_speed_10m,
                pressure_hpa: c.surface_pressure,
                is_day: c.is_day != 0,
            },
            hourly,
            daily,
            utc_offset_seconds: self.utc_offset_seconds,
        })
    }
}

/// Reading at the latest hour at or before `now` (local wall-clock time).
///
/// Falls back to the first hour when every entry lies in the future.
fn sample_air_quality(hourly: &OmAirHourly, now: NaiveDateTime) -> Option<AirQualitySnapshot> {
    if hourly.time.is_empty() {
        return None;
    }

    let idx = hourly
        .time
        .iter()
        .rposition(|t| parse_hourly_time(t).is_ok_and(|t| t <= now))
        .unwrap_or(0);

    Some(AirQualitySnapshot {
        pm25: hourly.pm2_5.get(idx).copied().flatten(),
        pm10: hourly.pm10.get(idx).copied().flatten(),
    })
}

fn local_now(utc_offset_seconds: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + ChronoDuration::seconds(i64::from(utc_offset_seconds))
}

fn coords(city: &City) -> [(&'static str, String); 2] {
    [
        ("latitude", city.lat.to_string()),
        ("longitude", city.lon.to_string()),
    ]
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    async fn forecast(&self, city: &City) -> Result<ForecastSnapshot, SourceError> {
        let [lat, lon] = coords(city);
        let query = [
            lat,
            lon,
            ("current", CURRENT_FIELDS.join(",")),
            ("hourly", HOURLY_FIELDS.join(",")),
            ("daily", DAILY_FIELDS.join(",")),
            ("timezone", self.timezone.clone()),
        ];

        let body = self.get_body(&self.forecast_url, &query).await?;
        let parsed: OmForecastResponse = serde_json::from_str(&body)
            .map_err(|e| payload(format!("forecast JSON: {e}")))?;

        parsed.into_snapshot()
    }

    async fn air_quality(&self, city: &City) -> Result<Option<AirQualitySnapshot>, SourceError> {
        let [lat, lon] = coords(city);
        let query = [
            lat,
            lon,
            ("hourly", AIR_QUALITY_FIELDS.join(",")),
            ("timezone", self.timezone.clone()),
        ];

        let body = self.get_body(&self.air_quality_url, &query).await?;
        let parsed: OmAirResponse = serde_json::from_str(&body)
            .map_err(|e| payload(format!("air-quality JSON: {e}")))?;

        let now = local_now(parsed.utc_offset_seconds);
        Ok(parsed.hourly.and_then(|h| sample_air_quality(&h, now)))
    }
}
