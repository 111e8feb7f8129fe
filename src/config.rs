//! Persisted widget state: panel position and the target time of day.

use crate::{countdown::TimeOfDay, error::PersistenceError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{fs, path::{Path, PathBuf}};

pub const CONFIG_FILE_NAME: &str = ".countdownclock_config.json";
pub const DEFAULT_X: i32 = 100;
pub const DEFAULT_Y: i32 = 100;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistedConfig {
    pub x: i32,
    pub y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time: Option<TimeOfDay>,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self { x: DEFAULT_X, y: DEFAULT_Y, target_time: None }
    }
}

impl PersistedConfig {
    /// Each field is recovered on its own so a bad target never costs the
    /// saved position.
    fn from_object(obj: &Map<String, Value>) -> Self {
        let coord = |key: &str, default: i32| {
            obj.get(key)
                .and_then(Value::as_i64)
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or(default)
        };

        let target_time = obj
            .get("target_time")
            .and_then(Value::as_str)
            .and_then(|s| match TimeOfDay::parse_persisted(s) {
                Ok(t) => Some(t),
                Err(e) => {
                    log::warn!("Ignoring saved target_time {:?}: {}", e.input, e);
                    None
                }
            });

        Self {
            x: coord("x", DEFAULT_X),
            y: coord("y", DEFAULT_Y),
            target_time,
        }
    }
}

pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: anything unreadable falls back to the defaults.
    pub fn load(&self) -> PersistedConfig {
        if !self.path.exists() {
            log::info!("No config at {}, using defaults", self.path.display());
            return PersistedConfig::default();
        }
        self.try_load().unwrap_or_else(|e| {
            log::warn!("Could not load {}: {}", self.path.display(), e);
            PersistedConfig::default()
        })
    }

    pub fn try_load(&self) -> Result<PersistedConfig, PersistenceError> {
        let text = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(obj) => Ok(PersistedConfig::from_object(&obj)),
            _ => Err(PersistenceError::NotAnObject),
        }
    }

    /// Best effort: failures are logged and otherwise ignored.
    pub fn save(&self, config: &PersistedConfig) {
        match self.try_save(config) {
            Ok(()) => log::debug!("Saved {:?} to {}", config, self.path.display()),
            Err(e) => log::warn!("Could not save {}: {}", self.path.display(), e),
        }
    }

    pub fn try_save(&self, config: &PersistedConfig) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        Ok(())
    }
}
