//! Per-(searchee, candidate) serialisation for concurrent assessment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

/// Per-key state for the lifetime of one engine (one run).
#[derive(Debug, Default)]
pub struct KeyState {
    /// A full assessment already ran for this key in this run.
    pub fully_assessed: bool,
}

/// Lazily created async lock per (searchee name, guid).
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<(String, String), Arc<AsyncMutex<KeyState>>>>,
}

impl KeyLocks {
    pub fn slot(&self, searchee: &str, guid: &str) -> Arc<AsyncMutex<KeyState>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry((searchee.to_string(), guid.to_string()))
            .or_default()
            .clone()
    }
}
