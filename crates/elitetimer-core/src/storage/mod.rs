mod config;
pub mod database;
mod memory;

pub use config::{Config, RuntimeConfig, TimerSettings};
pub use database::Database;
pub use memory::MemorySessionStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};
use crate::snapshot::SessionSnapshot;

/// Durable slot holding the single active-session snapshot.
///
/// Writes are synchronous and local. Implementations report failures;
/// the engine logs them and keeps running in memory.
pub trait SessionStore: Send {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// The stored snapshot, or `None` when there is none or it is unusable.
    fn load(&self) -> Result<Option<SessionSnapshot>, StorageError>;

    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Returns `~/.config/elitetimer[-dev]/` based on ELITETIMER_ENV.
///
/// Set ELITETIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ELITETIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("elitetimer-dev")
    } else {
        base_dir.join("elitetimer")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
