// config.rs

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::{protocol::TargetId, sensors::GeoSample, CompassResult};

const APP_NAME: &str = "omni_compass";
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "COMPASS_ENDPOINT";

fn default_config_path() -> PathBuf {
    let mut dir = dirs_next::config_dir().unwrap_or_else(|| {
        dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    dir.push(APP_NAME);
    dir.push(CONFIG_FILE_NAME);
    dir
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A fixed observer site, used when the platform has no live geolocation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl SiteLocation {
    pub fn to_sample(self) -> GeoSample {
        GeoSample::from_fix(self.latitude, self.longitude, self.elevation)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// WebSocket URL of the direction service
    pub endpoint: String,
    pub reconnect_delay_ms: u64,
    pub initial_target: TargetId,
    pub site: Option<SiteLocation>,
    /// Answer given to the orientation permission prompt
    pub orientation_consent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/ws".to_owned(),
            reconnect_delay_ms: 3000,
            initial_target: TargetId::Sun,
            site: None,
            orientation_consent: true,
        }
    }
}

impl Config {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Load from the default location, or return defaults if missing.
    ///
    /// The endpoint environment override is applied on top.
    pub fn load_or_default() -> CompassResult<Self> {
        let mut cfg = Self::load_from(&default_config_path())?;
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            cfg.endpoint = endpoint;
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Make `target` the one selected at next startup and persist it.
    /// Returns whether anything was written.
    pub fn remember_target(&mut self, target: TargetId) -> CompassResult<bool> {
        self.remember_target_at(&default_config_path(), target)
    }

    pub fn remember_target_at(&mut self, path: &Path, target: TargetId) -> CompassResult<bool> {
        if self.initial_target == target {
            return Ok(false);
        }
        self.initial_target = target;
        self.save_to(path)?;
        Ok(true)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }
}
