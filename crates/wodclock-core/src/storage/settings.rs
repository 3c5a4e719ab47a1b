//! TOML-based application settings.
//!
//! Stores:
//! - Audio cue preferences
//! - Tick resolution and countdown cue window
//! - Default values for protocol forms
//!
//! Settings are stored at `<data_dir>/settings.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::SettingsError;
use crate::protocol::ProtocolConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0..=100
    #[serde(default = "default_volume")]
    pub volume: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Countdown cues sound at this many seconds and below.
    #[serde(default = "default_countdown_cue_secs")]
    pub countdown_cue_secs: u64,
}

/// Starting values offered when a protocol form opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSettings {
    #[serde(default = "default_amrap_duration")]
    pub amrap_duration: u64,
    #[serde(default = "default_emom_duration")]
    pub emom_duration: u64,
    #[serde(default = "default_emom_interval_minutes")]
    pub emom_interval_minutes: u32,
    #[serde(default = "default_tabata_rounds")]
    pub tabata_rounds: u32,
    #[serde(default = "default_tabata_work")]
    pub tabata_work: u64,
    #[serde(default = "default_tabata_rest")]
    pub tabata_rest: u64,
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub presets: PresetSettings,
}

fn default_true() -> bool {
    true
}
fn default_volume() -> u32 {
    60
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_countdown_cue_secs() -> u64 {
    3
}
fn default_amrap_duration() -> u64 {
    20 * 60
}
fn default_emom_duration() -> u64 {
    10 * 60
}
fn default_emom_interval_minutes() -> u32 {
    1
}
fn default_tabata_rounds() -> u32 {
    8
}
fn default_tabata_work() -> u64 {
    20
}
fn default_tabata_rest() -> u64 {
    10
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            countdown_cue_secs: default_countdown_cue_secs(),
        }
    }
}

impl Default for PresetSettings {
    fn default() -> Self {
        Self {
            amrap_duration: default_amrap_duration(),
            emom_duration: default_emom_duration(),
            emom_interval_minutes: default_emom_interval_minutes(),
            tabata_rounds: default_tabata_rounds(),
            tabata_work: default_tabata_work(),
            tabata_rest: default_tabata_rest(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            timer: TimerSettings::default(),
            presets: PresetSettings::default(),
        }
    }
}

impl PresetSettings {
    pub fn amrap(&self) -> ProtocolConfig {
        ProtocolConfig::amrap(self.amrap_duration)
    }

    pub fn emom(&self) -> ProtocolConfig {
        ProtocolConfig::emom(self.emom_duration, self.emom_interval_minutes)
    }

    pub fn tabata(&self) -> ProtocolConfig {
        ProtocolConfig::tabata(self.tabata_rounds, self.tabata_work, self.tabata_rest)
    }
}

impl Settings {
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
    ) -> Result<(), SettingsError> {
        let unknown = || SettingsError::UnknownKey(key.to_string());
        let invalid = |message: String| SettingsError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
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
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
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

    pub fn path() -> Result<PathBuf, SettingsError> {
        Ok(data_dir()?.join("settings.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// defaults cannot be written.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`. Defaults are written only when the file does not
    /// exist; an unreadable file is an error and is left untouched.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let load_failed = |message: String| SettingsError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.save_to(path)?;
                Ok(settings)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let save_failed = |message: String| SettingsError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key in memory. Call `save` to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse as
    /// the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
