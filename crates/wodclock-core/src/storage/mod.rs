mod settings;

pub use settings::{AudioSettings, PresetSettings, Settings, TimerSettings};

use std::path::PathBuf;

use crate::error::SettingsError;

/// Returns the settings directory.
///
/// `WODCLOCK_HOME` wins when set. Otherwise `~/.config/wodclock`, or
/// `~/.config/wodclock-dev` with `WODCLOCK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, SettingsError> {
    let dir = match std::env::var_os("WODCLOCK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WODCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wodclock-dev")
            } else {
                base_dir.join("wodclock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| SettingsError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
