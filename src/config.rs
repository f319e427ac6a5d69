use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub content: ContentConfig,
    pub storage: StorageConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub auto_locate: bool,          // false behaves like a denied permission prompt
    pub manual_lat: Option<f64>,    // Used instead of IP lookup when both are set
    pub manual_lon: Option<f64>,
    pub lookup_ip: String,          // Empty asks ip-api about the caller's own address
    pub timeout_seconds: u64,
    pub max_age_seconds: u64,       // A fix younger than this is reused
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_locate: true,
            manual_lat: None,
            manual_lon: None,
            lookup_ip: String::new(),
            timeout_seconds: 10,
            max_age_seconds: 300,
        }
    }
}

impl LocationConfig {
    pub fn manual_point(&self) -> Option<GeoPoint> {
        match (self.manual_lat, self.manual_lon) {
            (Some(lat), Some(lon)) => match GeoPoint::new(lat, lon) {
                Ok(point) => Some(point),
                Err(e) => {
                    warn!("Ignoring manual location: {}", e);
                    None
                }
            },
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    pub default_city: String,   // Slug used on first run
    pub switch_delay_ms: u64,   // Settle time before a switched city's list appears
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_city: "tokyo".to_string(),
            switch_delay_ms: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub selection_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "tabemono.db".to_string(),
            selection_key: "tabemono-last-city".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 150 }
    }
}

impl Config {
    /// Loads config.toml from the root directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}
