//! Slippy-map tile math and the map view's rendering strategy.
//!
//! A map view starts in [`MapState::Loading`] and races the mapping library
//! against a timer exactly once. The winner picks one of two renderers and
//! the view never changes state again for that mount.

use std::{f64::consts::PI, fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::{geo::nearest_city, model::City};

/// Zoom of the static fallback tile.
pub const STATIC_MAP_ZOOM: u8 = 7;

/// How long the mapping library gets before the static fallback is used.
pub const MAP_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Web Mercator is only defined strictly inside this latitude.
pub const MAX_MERCATOR_LAT: f64 = 85.05;

pub const TILE_SERVER: &str = "https://tile.openstreetmap.org";
pub const MAP_VIEWER: &str = "https://www.openstreetmap.org/";
pub const MARKER_GLYPH: &str = "📍";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub zoom: u8,
}

impl TileCoord {
    pub fn url(&self) -> String {
        format!("{TILE_SERVER}/{}/{}/{}.png", self.zoom, self.x, self.y)
    }
}

/// Tile containing `(lat, lon)` at `zoom`.
///
/// Results for `|lat| >= 85.05` are meaningless.
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> TileCoord {
    let lat_rad = lat * PI / 180.0;
    let n = 2f64.powi(i32::from(zoom));

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    TileCoord {
        x: x as i64,
        y: y as i64,
        zoom,
    }
}

/// Link to the external map viewer centred on `(lat, lon)`.
pub fn viewer_url(lat: f64, lon: f64, zoom: u8) -> String {
    format!("{MAP_VIEWER}?mlat={lat}&mlon={lon}#map={zoom}/{lat}/{lon}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Loading,
    Interactive,
    StaticFallback,
}

/// What the presentation layer should draw.
#[derive(Debug, Clone, PartialEq)]
pub enum MapView {
    /// Rendering is handed to the mapping library.
    Interactive { lat: f64, lon: f64, zoom: u8 },
    Static(StaticMap),
}

/// A single tile with a marker, wrapped in a link to the map viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMap {
    pub tile: TileCoord,
    pub tile_url: String,
    pub link_url: String,
    pub marker: &'static str,
}

impl StaticMap {
    pub fn for_city(city: &City, zoom: u8) -> Self {
        let tile = lat_lon_to_tile(city.lat, city.lon, zoom);
        Self {
            tile_url: tile.url(),
            link_url: viewer_url(city.lat, city.lon, zoom),
            tile,
            marker: MARKER_GLYPH,
        }
    }
}

/// New city for a click on the interactive map.
pub fn city_for_click(lat: f64, lon: f64) -> City {
    let nearest = nearest_city(lat, lon).nearest;
    City::new(format!("Custom • {}", nearest.name), "Custom", lat, lon)
}

pub trait MapRenderer: Send + Sync + Debug {
    fn state(&self) -> MapState;
    fn render(&self, city: &City) -> MapView;

    /// Map click at `(lat, lon)`. Renderers without click support return `None`.
    fn click(&self, _lat: f64, _lon: f64) -> Option<City> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InteractiveRenderer {
    pub zoom: u8,
}

impl MapRenderer for InteractiveRenderer {
    fn state(&self) -> MapState {
        MapState::Interactive
    }

    fn render(&self, city: &City) -> MapView {
        MapView::Interactive {
            lat: city.lat,
            lon: city.lon,
            zoom: self.zoom,
        }
    }

    fn click(&self, lat: f64, lon: f64) -> Option<City> {
        Some(city_for_click(lat, lon))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StaticRenderer {
    pub zoom: u8,
}

impl MapRenderer for StaticRenderer {
    fn state(&self) -> MapState {
        MapState::StaticFallback
    }

    fn render(&self, city: &City) -> MapView {
        MapView::Static(StaticMap::for_city(city, self.zoom))
    }
}

/// The runtime-loaded mapping library.
#[async_trait]
pub trait MapLibrary: Send + Sync + Debug {
    /// Resolves `true` once the library is usable, `false` on load failure.
    async fn load(&self) -> bool;
}

/// Treats the library as ready once its script can be downloaded.
#[derive(Debug, Clone)]
pub struct HttpMapLibrary {
    http: Client,
    script_url: String,
}

impl HttpMapLibrary {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            script_url: script_url.into(),
        }
    }
}

#[async_trait]
impl MapLibrary for HttpMapLibrary {
    async fn load(&self) -> bool {
        match self.http.get(&self.script_url).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "map library download failed");
                false
            }
        }
    }
}

/// One mounted map view.
#[derive(Debug)]
pub struct MapMount {
    zoom: u8,
    renderer: Option<Box<dyn MapRenderer>>,
}

impl MapMount {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            renderer: None,
        }
    }

    pub fn state(&self) -> MapState {
        self.renderer
            .as_ref()
            .map_or(MapState::Loading, |r| r.state())
    }

    /// Race `library` against `timeout` and settle on a renderer.
    ///
    /// Only the first call on a mount races; later calls return the settled state.
    pub async fn resolve(&mut self, library: &dyn MapLibrary, timeout: Duration) -> MapState {
        if let Some(r) = &self.renderer {
            return r.state();
        }

        let ready = tokio::select! {
            ok = library.load() => ok,
            _ = tokio::time::sleep(timeout) => {
                tracing::info!(?timeout, "map library did not load in time");
                false
            }
        };

        let renderer: Box<dyn MapRenderer> = if ready {
            Box::new(InteractiveRenderer { zoom: self.zoom })
        } else {
            tracing::info!("falling back to static map");
            Box::new(StaticRenderer { zoom: self.zoom })
        };

        let state = renderer.state();
        self.renderer = Some(renderer);
        state
    }

    /// `None` while still loading.
    pub fn render(&self, city: &City) -> Option<MapView> {
        self.renderer.as_ref().map(|r| r.render(city))
    }

    pub fn click(&self, lat: f64, lon: f64) -> Option<City> {
        self.renderer.as_ref().and_then(|r| r.click(lat, lon))
    }
}
