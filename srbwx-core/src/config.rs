use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{locate::GeoOptions, model::Lang, orchestrator::FetchOptions};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const DEFAULT_MAP_LIBRARY_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
pub const DEFAULT_TIMEZONE: &str = "Europe/Belgrade";

/// Top-level configuration stored on disk.
///
/// Every field has a default, so a partial file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forecast_url: String,
    pub air_quality_url: String,
    pub map_library_url: String,

    /// Timezone sent with every query; daily and hourly series are local to it.
    pub timezone: String,

    pub request_timeout_secs: u64,
    pub air_quality_timeout_secs: u64,
    pub map_load_timeout_secs: u64,
    pub geolocation_timeout_secs: u64,
    pub geolocation_max_age_secs: u64,
    pub tile_zoom: u8,

    /// Used until a language is chosen with `srbwx lang`.
    pub default_lang: Lang,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            air_quality_url: DEFAULT_AIR_QUALITY_URL.to_string(),
            map_library_url: DEFAULT_MAP_LIBRARY_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            request_timeout_secs: 15,
            air_quality_timeout_secs: 5,
            map_load_timeout_secs: 5,
            geolocation_timeout_secs: 10,
            geolocation_max_age_secs: 600,
            tile_zoom: crate::tiles::STATIC_MAP_ZOOM,
            default_lang: Lang::Sr,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("rs", "srbwx", "srbwx")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            air_quality_timeout: Duration::from_secs(self.air_quality_timeout_secs),
        }
    }

    pub fn map_load_timeout(&self) -> Duration {
        Duration::from_secs(self.map_load_timeout_secs)
    }

    pub fn geo_options(&self) -> GeoOptions {
        GeoOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(self.geolocation_timeout_secs),
            max_age: Duration::from_secs(self.geolocation_max_age_secs),
        }
    }
}
