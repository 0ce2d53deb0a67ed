//! Named radio stations
//!
//! Maps case-insensitive station names to stream URLs. Built-in presets are
//! merged with stations from the config file and stations added at runtime.
//!
//! Runtime additions can optionally be saved to a JSON file (a flat
//! `{"name": "url"}` object) and are loaded back from it at startup.

use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};
use url::Url;

/// Stations available without any configuration
pub const PRESET_STATIONS: &[(&str, &str)] = &[
    (
        "gaucha",
        "https://liverdgaupoa.rbsdirect.com.br/primary/gaucha_rbs.sdp/playlist.m3u8",
    ),
    (
        "atlantida",
        "https://liverdatlpoa.rbsdirect.com.br/primary/atl_poa.sdp/playlist.m3u8",
    ),
    ("gay", "https://0n-gay.radionetz.de/0n-gay.mp3"),
];

/// Where a station entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationOrigin {
    Preset,
    Configured,
    Custom,
}

/// One named station
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Station {
    pub name: String,
    pub url: String,
    pub origin: StationOrigin,
}

/// Thread-safe station name lookup
#[derive(Debug)]
pub struct StationCatalog {
    stations: RwLock<BTreeMap<String, Station>>,
    custom_file: Option<PathBuf>,
}

impl StationCatalog {
    /// Catalog containing only the presets
    pub fn with_presets() -> Self {
        let stations = PRESET_STATIONS
            .iter()
            .map(|(name, url)| {
                (
                    name.to_string(),
                    Station {
                        name: name.to_string(),
                        url: url.to_string(),
                        origin: StationOrigin::Preset,
                    },
                )
            })
            .collect();

        Self {
            stations: RwLock::new(stations),
            custom_file: None,
        }
    }

    /// Catalog with presets plus configured stations
    ///
    /// Configured entries override presets of the same name.
    pub fn from_config(configured: &BTreeMap<String, String>) -> Result<Self> {
        let catalog = Self::with_presets();
        {
            let mut stations = catalog.write();
            for (name, url) in configured {
                let name = normalize_name(name)?;
                validate_stream_url(url)?;
                stations.insert(
                    name.clone(),
                    Station {
                        name,
                        url: url.clone(),
                        origin: StationOrigin::Configured,
                    },
                );
            }
        }
        Ok(catalog)
    }

    /// Save custom stations to `path` on every [`add`](Self::add)
    ///
    /// Stations already in the file are loaded as custom entries. A missing
    /// file is an empty list; unreadable entries are skipped with a warning.
    pub fn persist_to(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let saved = load_custom_file(&path)?;
        {
            let mut stations = self.write();
            for (name, url) in saved {
                let valid = normalize_name(&name)
                    .and_then(|name| validate_stream_url(&url).map(|_| name));
                match valid {
                    Ok(name) => {
                        stations.insert(
                            name.clone(),
                            Station {
                                name,
                                url,
                                origin: StationOrigin::Custom,
                            },
                        );
                    }
                    Err(e) => warn!(file = %path.display(), "Skipping saved station: {}", e),
                }
            }
        }
        info!(file = %path.display(), "Custom stations persisted");
        self.custom_file = Some(path);
        Ok(self)
    }

    /// Look up a stream URL by station name
    pub fn resolve(&self, name: &str) -> Option<String> {
        let key = name.trim().to_lowercase();
        self.read().get(&key).map(|s| s.url.clone())
    }

    /// Add or replace a custom station
    pub fn add(&self, name: &str, url: &str) -> Result<Station> {
        let name = normalize_name(name)?;
        validate_stream_url(url)?;

        let station = Station {
            name: name.clone(),
            url: url.to_string(),
            origin: StationOrigin::Custom,
        };
        let mut stations = self.write();
        stations.insert(name, station.clone());
        info!(station = %station.name, url = %station.url, "Custom station added");

        // Saved under the write lock so concurrent adds cannot overwrite each other
        if let Some(path) = &self.custom_file {
            if let Err(e) = save_custom(&stations, path) {
                warn!(file = %path.display(), "Failed to save custom stations: {}", e);
            }
        }
        Ok(station)
    }

    /// All stations, sorted by name
    pub fn list(&self) -> Vec<Station> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Station>> {
        // Entries are inserted whole, so a poisoned map is still consistent
        self.stations.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Station>> {
        self.stations.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StationCatalog {
    fn default() -> Self {
        Self::with_presets()
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
            "station name must be a single non-empty word: {:?}",
            name
        )));
    }
    Ok(name)
}

/// Write the custom entries of `stations` as a `{"name": "url"}` object
fn save_custom(stations: &BTreeMap<String, Station>, path: &Path) -> Result<()> {
    let custom: BTreeMap<&str, &str> = stations
        .values()
        .filter(|s| s.origin == StationOrigin::Custom)
        .map(|s| (s.name.as_str(), s.url.as_str()))
        .collect();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&custom)
        .map_err(|e| Error::InvalidInput(format!("cannot encode stations: {}", e)))?;
    std::fs::write(path, json)?;
    Ok(())
}

fn load_custom_file(path: &Path) -> Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!("invalid stations file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Accept absolute URLs that name a host
pub fn validate_stream_url(url: &str) -> Result<()> {
    let invalid = |reason: &dyn std::fmt::Display| {
        Error::InvalidInput(format!("invalid stream URL {:?}: {}", url, reason))
    };

    // The parser silently strips surrounding whitespace
    if url.trim() != url {
        return Err(invalid(&"surrounding whitespace"));
    }
    let parsed = Url::parse(url).map_err(|e| invalid(&e))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid(&"no host"));
    }
    Ok(())
}
