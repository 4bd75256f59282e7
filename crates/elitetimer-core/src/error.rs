//! Core error types for elitetimer-core.
//!
//! None of these reach the person using the timer: the engine absorbs
//! storage and tick failures locally and logs them. They exist so the
//! collaborators and the CLI can report what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for elitetimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Snapshot store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Persisted snapshot could not be used
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session runtime errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Errors raised by a [`SessionStore`](crate::storage::SessionStore).
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another process
    #[error("Database is locked")]
    Locked,

    /// Snapshot could not be encoded
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// Store refused the write (used by test doubles and read-only hosts)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a persisted snapshot is treated as absent.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Stored payload is not valid JSON for a snapshot
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A numeric field is negative, not finite or out of range
    #[error("Invalid value for '{field}': {value}")]
    InvalidField { field: &'static str, value: f64 },
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

    /// Unknown dotted configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not resolve the data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

/// Failures inside a single engine step.
///
/// These are caught by [`TimerEngine::tick`](crate::timer::TimerEngine::tick)
/// and logged; the next tick proceeds normally.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimerError {
    /// Running without the wall-clock anchors needed for a snapshot
    #[error("Running session has no wall-clock anchor")]
    MissingAnchor,

    /// Session or interval duration is zero
    #[error("Invalid duration for {0}: must be at least 1 second")]
    InvalidDuration(&'static str),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}
