//! Core error types for puzzlealarm-core.
//!
//! This module defines the error hierarchy using thiserror. Validation is
//! always checked before any I/O, so a `Validation` error guarantees that
//! nothing was persisted or scheduled.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for puzzlealarm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The alarm record breaks a structural or business rule
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No alarm with this id exists
    #[error("Alarm '{id}' not found")]
    NotFound { id: String },

    /// Every scheduling path for an occurrence failed
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// The snooze budget for the current ringing is spent
    #[error("Snooze limit reached ({count}/{max})")]
    SnoozeLimitReached { count: u32, max: u32 },

    /// Reading or writing the store failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A ringing-session command was issued in a state that does not accept it
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A mutation lock was poisoned by a panicking writer
    #[error("Mutation lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Time is not a 24-hour `HH:MM` string
    #[error("Invalid time '{0}': expected HH:MM (24-hour)")]
    InvalidTime(String),

    #[error("Label must not be empty")]
    LabelRequired,

    /// Custom repeat without any selected day
    #[error("Custom repeat requires at least one day")]
    MissingRepeatDays,

    #[error("Repeat day {0} out of range 0-6")]
    InvalidRepeatDay(u8),

    #[error("Volume {0} out of range 0.0-1.0")]
    VolumeOutOfRange(f32),

    #[error("Sound reference must not be empty")]
    EmptySound,

    #[error("Unknown built-in sound '{0}'")]
    UnknownSound(String),

    #[error("Sound name must not be empty")]
    SoundNameRequired,

    #[error("Snooze duration {0} out of range 1-60 minutes")]
    SnoozeDurationOutOfRange(u32),

    #[error("Snooze max count {0} out of range 1-10")]
    SnoozeCountOutOfRange(u32),

    /// Auto-shorten step must be strictly smaller than the snooze duration
    #[error("Shorten-by {shorten_by} must be less than duration {duration}")]
    ShortenByTooLarge { shorten_by: u32, duration: u32 },

    /// An enabled challenge lacks its puzzle type or difficulty
    #[error("Enabled {which} challenge is missing its {missing}")]
    IncompleteChallenge {
        which: &'static str,
        missing: &'static str,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored value does not decode into the expected shape
    #[error("Corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded for storage
    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Backend refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Scheduling-specific errors, as reported by the native gateway or the
/// fallback notification scheduler.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    /// The platform refused an exact wake-up (permission revoked, quota)
    #[error("Exact scheduling refused for '{handle_id}': {reason}")]
    ExactRefused { handle_id: String, reason: String },

    /// Native module absent on this platform
    #[error("Native alarm module not available")]
    Unavailable,

    /// The fallback notification could not be scheduled either
    #[error("Notification scheduling failed for '{handle_id}': {reason}")]
    NotificationFailed { handle_id: String, reason: String },

    /// Cancelling a handle failed for a reason other than absence
    #[error("Cancel failed for '{handle_id}': {reason}")]
    CancelFailed { handle_id: String, reason: String },

    /// The requested fire time could not be mapped to an instant
    #[error("No valid instant for local time {0}")]
    UnmappableTime(chrono::NaiveDateTime),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    PersistenceError::Locked
                } else {
                    PersistenceError::QueryFailed(err.to_string())
                }
            }
            _ => PersistenceError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Persistence(err.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoreError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
