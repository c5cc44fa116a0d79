mod config;
pub mod database;
pub mod kv;

pub use config::{AlarmDefaults, Config, SchedulingConfig, SnoozeDefaults};
pub use database::{Database, TriggerRow};
pub use kv::{KeyValueStore, MemoryStore, ALARMS_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `PUZZLEALARM_DATA_DIR` overrides the location outright. Otherwise it is
/// `~/.config/puzzlealarm[-dev]/`, with the `-dev` suffix when
/// `PUZZLEALARM_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PUZZLEALARM_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("PUZZLEALARM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("puzzlealarm-dev")
            } else {
                base_dir.join("puzzlealarm")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
