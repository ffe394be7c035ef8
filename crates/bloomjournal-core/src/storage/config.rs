//! TOML-based application configuration.
//!
//! Stores engine tunables and runtime preferences:
//! - Entry boost and decay policy
//! - Calendar-day boundary (fixed UTC offset)
//! - Health-check cadence
//! - Reward RNG seed
//! - Compare-and-swap retry budget
//!
//! Configuration is stored at `~/.config/bloomjournal/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::DayBoundary;
use crate::error::{ConfigError, Result};
use crate::plant::HealthPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    #[serde(default = "default_entry_boost")]
    pub entry_boost: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
    #[serde(default = "default_penalty_per_day")]
    pub penalty_per_day: u32,
    #[serde(default = "default_max_penalty")]
    pub max_penalty: u32,
    #[serde(default = "default_severe_neglect_days")]
    pub severe_neglect_days: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayBoundaryConfig {
    /// Minutes east of UTC where a calendar day starts.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_startup_delay_seconds")]
    pub startup_delay_seconds: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Fixed seed for reward kinds. Unset means a fresh entropy seed per process.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub default_id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/bloomjournal/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub day_boundary: DayBoundaryConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub user: UserConfig,
}

// Default functions
fn default_entry_boost() -> u8 {
    10
}
fn default_grace_days() -> u32 {
    2
}
fn default_penalty_per_day() -> u32 {
    8
}
fn default_max_penalty() -> u32 {
    50
}
fn default_severe_neglect_days() -> u32 {
    7
}
fn default_interval_minutes() -> u32 {
    5
}
fn default_startup_delay_seconds() -> u32 {
    5
}
fn default_max_cas_attempts() -> u32 {
    5
}
fn default_user_id() -> String {
    "local".into()
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            entry_boost: default_entry_boost(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
            penalty_per_day: default_penalty_per_day(),
            max_penalty: default_max_penalty(),
            severe_neglect_days: default_severe_neglect_days(),
        }
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            startup_delay_seconds: default_startup_delay_seconds(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_cas_attempts: default_max_cas_attempts(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_id: default_user_id(),
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    // Unset optional: accept a number, or "none" to keep it unset.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null") {
                            serde_json::Value::Null
                        } else {
                            parse_number(value).ok_or_else(|| {
                                invalid(format!("cannot parse '{value}' as number"))
                            })?
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy {
            entry_boost: self.growth.entry_boost,
            grace_days: self.decay.grace_days,
            penalty_per_day: self.decay.penalty_per_day,
            max_penalty: self.decay.max_penalty,
            severe_neglect_days: self.decay.severe_neglect_days,
        }
    }

    pub fn day_boundary(&self) -> DayBoundary {
        DayBoundary::from_offset_minutes(self.day_boundary.utc_offset_minutes)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.health_check.interval_minutes.max(1)))
    }

    pub fn health_check_startup_delay(&self) -> Duration {
        Duration::seconds(i64::from(self.health_check.startup_delay_seconds))
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else if let Ok(n) = value.parse::<i64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}
