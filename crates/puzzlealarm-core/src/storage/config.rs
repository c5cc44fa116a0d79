//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Display language (drives the placeholder label for unnamed alarms)
//! - Default dismiss settings for new alarms
//! - Default snooze settings for new alarms
//! - Scheduling lookahead for platforms without recurring triggers
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::alarm::{AlarmSettings, AlarmTime, NewAlarm, SnoozeSettings, SoundRef};
use crate::error::ConfigError;
use crate::recurrence::LookaheadWindow;

/// Default dismiss settings applied to new alarms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDefaults {
    /// Key of a built-in sound.
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "default_sound_name")]
    pub sound_name: String,
    #[serde(default = "default_true")]
    pub vibrate: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub gradual_volume: bool,
}

/// Default snooze settings applied to new alarms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnoozeDefaults {
    #[serde(default = "default_snooze_duration")]
    pub duration: u32,
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    #[serde(default)]
    pub require_challenge: bool,
    #[serde(default)]
    pub auto_shorten: bool,
    #[serde(default = "default_shorten_by")]
    pub shorten_by: u32,
    #[serde(default)]
    pub progressive_difficulty: bool,
}

/// Scheduling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Occurrences materialized per repeating alarm.
    #[serde(default = "default_lookahead")]
    pub lookahead_occurrences: usize,
    /// Days scanned when materializing occurrences.
    #[serde(default = "default_scan_limit")]
    pub scan_limit_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub alarm: AlarmDefaults,
    #[serde(default)]
    pub snooze: SnoozeDefaults,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

// Default functions
fn default_language() -> String {
    "en".into()
}
fn default_sound() -> String {
    "default".into()
}
fn default_sound_name() -> String {
    "Default Sound".into()
}
fn default_true() -> bool {
    true
}
fn default_volume() -> f32 {
    0.8
}
fn default_snooze_duration() -> u32 {
    5
}
fn default_max_count() -> u32 {
    3
}
fn default_shorten_by() -> u32 {
    1
}
fn default_lookahead() -> usize {
    crate::recurrence::DEFAULT_LOOKAHEAD
}
fn default_scan_limit() -> u32 {
    crate::recurrence::SCAN_LIMIT_DAYS
}

impl Default for AlarmDefaults {
    fn default() -> Self {
        Self {
            sound: default_sound(),
            sound_name: default_sound_name(),
            vibrate: true,
            volume: default_volume(),
            gradual_volume: false,
        }
    }
}

impl Default for SnoozeDefaults {
    fn default() -> Self {
        Self {
            duration: default_snooze_duration(),
            max_count: default_max_count(),
            require_challenge: false,
            auto_shorten: false,
            shorten_by: default_shorten_by(),
            progressive_difficulty: false,
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            lookahead_occurrences: default_lookahead(),
            scan_limit_days: default_scan_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            alarm: AlarmDefaults::default(),
            snooze: SnoozeDefaults::default(),
            scheduling: SchedulingConfig::default(),
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
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
            }),
        }
    }

    /// Persist to the default location.
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

    /// Set a value by dot-separated key without saving. The whole config is
    /// re-validated; on error `self` is unchanged.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        if !matches!(self.language.as_str(), "en" | "ar") {
            return Err(invalid("language", format!("unsupported language '{}'", self.language)));
        }
        if !(1..=64).contains(&self.scheduling.lookahead_occurrences) {
            return Err(invalid(
                "scheduling.lookahead_occurrences",
                "must be between 1 and 64".into(),
            ));
        }
        if self.scheduling.scan_limit_days < 7 {
            return Err(invalid("scheduling.scan_limit_days", "must be at least 7".into()));
        }
        crate::alarm::validate_settings(&self.alarm_settings())
            .map_err(|e| invalid("alarm", e.to_string()))?;
        crate::alarm::validate_snooze_settings(&self.snooze_settings())
            .map_err(|e| invalid("snooze", e.to_string()))?;
        Ok(())
    }

    /// Label shown for alarms the user did not name.
    pub fn placeholder_label(&self) -> &'static str {
        match self.language.as_str() {
            "ar" => "منبه جديد",
            _ => "New Alarm",
        }
    }

    pub fn alarm_settings(&self) -> AlarmSettings {
        AlarmSettings {
            sound: SoundRef::builtin(self.alarm.sound.clone()),
            sound_name: self.alarm.sound_name.clone(),
            vibrate: self.alarm.vibrate,
            volume: self.alarm.volume,
            gradual_volume: self.alarm.gradual_volume,
            dismiss_challenge: None,
        }
    }

    pub fn snooze_settings(&self) -> SnoozeSettings {
        SnoozeSettings {
            duration: self.snooze.duration,
            max_count: self.snooze.max_count,
            require_challenge: self.snooze.require_challenge,
            challenge_config: None,
            auto_shorten: self.snooze.auto_shorten,
            shorten_by: self.snooze.shorten_by,
            progressive_difficulty: self.snooze.progressive_difficulty,
        }
    }

    /// A new enabled one-shot alarm carrying the configured defaults.
    pub fn new_alarm(&self, time: AlarmTime) -> NewAlarm {
        NewAlarm::new(time)
            .settings(self.alarm_settings())
            .snooze_settings(self.snooze_settings())
    }

    pub fn lookahead(&self) -> LookaheadWindow {
        LookaheadWindow {
            occurrences: self.scheduling.lookahead_occurrences,
            scan_days: self.scheduling.scan_limit_days,
        }
    }
}
