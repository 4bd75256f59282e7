//! TOML-based application configuration.
//!
//! Stores:
//! - Session and interval lengths
//! - Runtime tuning (tick cadence, snapshot throttle, countdown fallback)
//!
//! Configuration is stored at `~/.config/elitetimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::EngineConfig;

/// Session timing chosen by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u64,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

/// Engine and driver tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Fixed tick delay in ms. 0 ticks at frame cadence.
    #[serde(default)]
    pub tick_interval_ms: u64,
    #[serde(default = "default_persist_min_interval_ms")]
    pub persist_min_interval_ms: i64,
    #[serde(default = "default_countdown_fallback_ms")]
    pub countdown_fallback_ms: i64,
    #[serde(default = "default_max_completions_per_tick")]
    pub max_completions_per_tick: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/elitetimer/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// Default functions
fn default_session_minutes() -> u64 {
    60
}
fn default_interval_seconds() -> u64 {
    30
}
fn default_persist_min_interval_ms() -> i64 {
    crate::timer::DEFAULT_PERSIST_MIN_INTERVAL_MS
}
fn default_countdown_fallback_ms() -> i64 {
    crate::timer::COUNTDOWN_FALLBACK_MS
}
fn default_max_completions_per_tick() -> u32 {
    crate::timer::MAX_COMPLETIONS_PER_TICK
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            session_minutes: default_session_minutes(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 0,
            persist_min_interval_ms: default_persist_min_interval_ms(),
            countdown_fallback_ms: default_countdown_fallback_ms(),
            max_completions_per_tick: default_max_completions_per_tick(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerSettings::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.engine_config().validate().map_err(|e| invalid(e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            session_duration_secs: self.timer.session_minutes.saturating_mul(60),
            default_interval_secs: self.timer.interval_seconds,
            persist_min_interval_ms: self.runtime.persist_min_interval_ms,
            countdown_fallback_ms: self.runtime.countdown_fallback_ms,
            max_completions_per_tick: self.runtime.max_completions_per_tick,
        }
    }
}
