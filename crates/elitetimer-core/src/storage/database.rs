//! SQLite-backed snapshot storage.
//!
//! The active session lives as one JSON value in a small key-value table.
//! A single key means at most one snapshot exists per database.

use std::path::Path;

use rusqlite::{params, Connection};

use super::{data_dir, SessionStore};
use crate::error::{CoreError, StorageError};
use crate::snapshot::SessionSnapshot;

/// Key under which the active session snapshot is stored.
pub const ACTIVE_SESSION_KEY: &str = "active_session";

/// SQLite database holding the active session snapshot.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/elitetimer/elitetimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("elitetimer.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store. Missing keys are fine.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let json = snapshot.to_json()?;
        self.kv_set(ACTIVE_SESSION_KEY, &json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let Some(json) = self.kv_get(ACTIVE_SESSION_KEY)? else {
            return Ok(None);
        };
        match SessionSnapshot::from_json(&json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                tracing::warn!(target: "elitetimer::store", "Ignoring unusable session snapshot: {}", err);
                Ok(None)
            }
        }
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.kv_delete(ACTIVE_SESSION_KEY)?;
        Ok(())
    }
}
