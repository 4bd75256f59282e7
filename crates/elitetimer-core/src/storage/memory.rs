use std::sync::{Arc, Mutex, MutexGuard};

use super::SessionStore;
use crate::error::StorageError;
use crate::snapshot::SessionSnapshot;

#[derive(Debug, Default)]
struct Slot {
    json: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-process snapshot store.
///
/// Clones share one slot, so a host (or a test) can keep a handle to
/// inspect what the engine wrote. The payload is kept as JSON to go through
/// the same validation as an on-disk store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        // A poisoned slot still holds a usable payload.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.slot().writes
    }

    /// Raw stored payload.
    pub fn raw(&self) -> Option<String> {
        self.slot().json.clone()
    }

    /// Replace the stored payload verbatim, bypassing validation.
    pub fn put_raw(&self, json: impl Into<String>) {
        self.slot().json = Some(json.into());
    }

    /// Make subsequent writes fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.slot().fail_writes = fail;
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let mut slot = self.slot();
        if slot.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        slot.json = Some(snapshot.to_json()?);
        slot.writes += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let Some(json) = self.raw() else {
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
        self.slot().json = None;
        Ok(())
    }
}
