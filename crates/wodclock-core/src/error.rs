//! Core error types for wodclock-core.
//!
//! Protocol configuration problems are the only recoverable failure the timer
//! itself raises; settings and audio errors live alongside so callers can
//! funnel everything through [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::protocol::ProtocolType;

/// Core error type for wodclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Protocol configuration could not be turned into a plan
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings file errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Audio output errors (only surfaced by explicit probes, never by the timer)
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Protocol configuration errors raised by the plan builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field the protocol needs was not supplied
    #[error("{protocol} requires '{field}'")]
    MissingField {
        protocol: ProtocolType,
        field: &'static str,
    },

    /// A field was supplied with an unusable value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn missing(protocol: ProtocolType, field: &'static str) -> Self {
        ConfigError::MissingField { protocol, field }
    }

    pub(crate) fn too_large(field: &'static str, max: u64) -> Self {
        ConfigError::InvalidValue {
            field,
            message: format!("must be at most {max}"),
        }
    }

    pub(crate) fn zero(field: &'static str) -> Self {
        ConfigError::InvalidValue {
            field,
            message: "must be greater than zero".into(),
        }
    }
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load settings
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save settings
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the settings tree
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    /// Value could not be parsed for the key's type
    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Audio output errors.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No output device could be opened
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// Device opened but uses a format we cannot feed
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Playback failed after the device was acquired
    #[error("Audio playback failed: {0}")]
    Playback(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
