//! Persisted key-value state: last selected city, geolocation permission
//! memory and language preference.
//!
//! Writes through [`Preferences`] are best-effort: a failing store is logged
//! and otherwise ignored so the triggering operation still completes.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    model::{City, Lang},
};

pub const KEY_LAST_CITY: &str = "lastCity";
pub const KEY_GEO_STATUS: &str = "geoStatus";
pub const KEY_LANG: &str = "lang";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// TOML-backed store kept next to the configuration file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("rs", "srbwx", "srbwx")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(Self::new(dirs.data_dir().join("state.toml")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        toml::from_str(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut all = match self.read_all() {
            Ok(all) => all,
            // A corrupt file is replaced rather than blocking every later write.
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(path = %self.path.display(), %reason, "replacing corrupt file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        all.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(&all).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        fs::write(&self.path, toml)?;
        Ok(())
    }
}

/// Process-local store, used when no persistent location is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Unavailable)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Remembered outcome of the last geolocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoStatus {
    Granted,
    Denied,
}

impl GeoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoStatus::Granted => "granted",
            GeoStatus::Denied => "denied",
        }
    }
}

/// Typed access to the persisted keys.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "store write failed; continuing without persisting");
        }
    }

    /// `None` when nothing was saved or the saved value does not decode.
    pub fn last_city(&self) -> Option<City> {
        let raw = self.read(KEY_LAST_CITY)?;
        match serde_json::from_str(&raw) {
            Ok(city) => Some(city),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring undecodable lastCity");
                None
            }
        }
    }

    pub fn save_last_city(&self, city: &City) {
        match serde_json::to_string(city) {
            Ok(json) => self.write(KEY_LAST_CITY, &json),
            Err(e) => tracing::warn!(error = %e, "could not serialize city"),
        }
    }

    pub fn geo_status(&self) -> Option<GeoStatus> {
        match self.read(KEY_GEO_STATUS)?.as_str() {
            "granted" => Some(GeoStatus::Granted),
            "denied" => Some(GeoStatus::Denied),
            _ => None,
        }
    }

    pub fn set_geo_status(&self, status: GeoStatus) {
        self.write(KEY_GEO_STATUS, status.as_str());
    }

    /// Anything other than `"en"` means Serbian.
    pub fn lang(&self) -> Lang {
        self.lang_or(Lang::Sr)
    }

    /// Saved language, or `default` when none (or an unknown one) is saved.
    pub fn lang_or(&self, default: Lang) -> Lang {
        match self.read(KEY_LANG).as_deref() {
            Some("en") => Lang::En,
            Some("sr") => Lang::Sr,
            _ => default,
        }
    }

    pub fn set_lang(&self, lang: Lang) {
        self.write(KEY_LANG, lang.as_str());
    }
}
