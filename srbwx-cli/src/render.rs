//! Plain-text output for reports and maps.

use std::fmt::Write;

use srbwx_core::{
    City, ForecastReport, Lang, MapView,
    model::{AlertLevel, weather_glyph},
};

const PLACEHOLDER: &str = "—";

/// Fixed strings in the selected language.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub now: &'static str,
    pub feels_like: &'static str,
    pub humidity: &'static str,
    pub wind: &'static str,
    pub pressure: &'static str,
    pub air_quality: &'static str,
    pub next_24h: &'static str,
    pub alerts: &'static str,
    pub no_alerts: &'static str,
    pub daily: &'static str,
    pub error: &'static str,
}

pub fn labels(lang: Lang) -> Labels {
    match lang {
        Lang::Sr => Labels {
            now: "Trenutno",
            feels_like: "oseća se kao",
            humidity: "Vlažnost",
            wind: "Vetar",
            pressure: "Pritisak",
            air_quality: "Kvalitet vazduha",
            next_24h: "Narednih 24h",
            alerts: "Upozorenja",
            no_alerts: "Nema upozorenja za naredna 3 dana.",
            daily: "Prognoza",
            error: "Neuspešno preuzimanje prognoze.",
        },
        Lang::En => Labels {
            now: "Now",
            feels_like: "feels like",
            humidity: "Humidity",
            wind: "Wind",
            pressure: "Pressure",
            air_quality: "Air quality",
            next_24h: "Next 24h",
            alerts: "Alerts",
            no_alerts: "No alerts for the next 3 days.",
            daily: "Forecast",
            error: "Failed to fetch forecast.",
        },
    }
}

fn level_tag(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "[i]",
        AlertLevel::Warn => "[!]",
        AlertLevel::Danger => "[!!]",
    }
}

fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:.0}"))
}

pub fn report(report: &ForecastReport, lang: Lang) -> String {
    let l = labels(lang);
    let current = &report.forecast.current;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", report.city.label());
    let _ = writeln!(
        out,
        "{}: {:.1}°C ({} {:.1}°C)",
        l.now, current.temp, l.feels_like, current.feels_like
    );
    let _ = writeln!(
        out,
        "{}: {:.0}%  {}: {:.0} km/h  {}: {:.0} hPa",
        l.humidity,
        current.humidity_pct,
        l.wind,
        current.wind_speed_kmh,
        l.pressure,
        current.pressure_hpa
    );

    let aq = report.air_quality.unwrap_or_default();
    let _ = writeln!(
        out,
        "{}: PM2.5 {} µg/m³  PM10 {} µg/m³",
        l.air_quality,
        reading(aq.pm25),
        reading(aq.pm10)
    );

    if !report.forecast.hourly.is_empty() {
        let (min, max) = report.forecast.next_24h_range();
        let _ = writeln!(out, "{}: {min:.0}°C .. {max:.0}°C", l.next_24h);
    }

    let _ = writeln!(out);
    if report.alerts.is_empty() {
        let _ = writeln!(out, "{}", l.no_alerts);
    } else {
        let _ = writeln!(out, "{}:", l.alerts);
        for alert in &report.alerts {
            let _ = writeln!(out, "  {} {}", level_tag(alert.level), alert.message);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}:", l.daily);
    for day in &report.forecast.daily {
        let _ = writeln!(
            out,
            "  {}  {}  {:>5.1}°C / {:>5.1}°C  {:>5.1} mm",
            day.date.format("%a %d.%m."),
            weather_glyph(day.weather_code),
            day.max,
            day.min,
            day.precipitation_mm
        );
    }

    out
}

pub fn map(city: &City, view: &MapView) -> String {
    match view {
        MapView::Interactive { lat, lon, zoom } => {
            format!("{}: {lat:.4}, {lon:.4} (zoom {zoom})\n", city.label())
        }
        MapView::Static(map) => format!(
            "{} {}\n  tile: {}\n  open: {}\n",
            map.marker,
            city.label(),
            map.tile_url,
            map.link_url
        ),
    }
}
