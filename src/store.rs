//! The single shared "current reading" cell.
//!
//! One background writer (the source reader) and any number of request
//! handlers share this store. `Reading` is `Copy`, so the lock is only held
//! for the duration of a copy and no caller can observe a torn value.

use crate::core::Reading;
use std::sync::{Arc, RwLock};

/// Holds at most one reading: the latest.
#[derive(Debug, Default)]
pub struct ReadingStore {
    latest: RwLock<Option<Reading>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading.
    pub fn publish(&self, reading: Reading) {
        // A poisoned lock still holds a whole Reading; keep serving it.
        let mut slot = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(reading);
    }

    /// The most recently published reading, if any.
    pub fn latest(&self) -> Option<Reading> {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Timestamp of the most recently published reading.
    pub fn last_update(&self) -> Option<i64> {
        self.latest().map(|r| r.timestamp_millis())
    }
}

/// Thread-safe shared reading store.
pub type SharedReadingStore = Arc<ReadingStore>;
