//! Decision cache - remembers the outcome for every (searchee, candidate) pair.
//!
//! Entries are created or updated in place, never deleted. Every mutation is
//! durable before the call returns.

mod sqlite;
mod types;

pub use sqlite::SqliteDecisionStore;
pub use types::*;

use std::collections::BTreeMap;

/// Trait for decision cache storage.
pub trait DecisionStore: Send + Sync {
    /// Get the entry for a searchee/candidate pair.
    fn get(&self, searchee: &str, guid: &str)
        -> Result<Option<DecisionCacheEntry>, DecisionStoreError>;

    /// Create or update an entry and flush it to durable storage.
    ///
    /// An existing entry keeps its original `first_seen`.
    fn put(
        &self,
        searchee: &str,
        guid: &str,
        entry: &DecisionCacheEntry,
    ) -> Result<(), DecisionStoreError>;

    /// All entries for one searchee, keyed by candidate guid.
    fn entries_for(
        &self,
        searchee: &str,
    ) -> Result<BTreeMap<String, DecisionCacheEntry>, DecisionStoreError>;

    /// The whole cache as a keyed document.
    fn export(&self) -> Result<DecisionDocument, DecisionStoreError>;

    /// Import entries from a keyed document.
    ///
    /// Existing entries win; returns the number of entries added.
    fn import(&self, document: &DecisionDocument) -> Result<u64, DecisionStoreError>;

    /// Get cache statistics.
    fn stats(&self) -> Result<DecisionStats, DecisionStoreError>;
}
