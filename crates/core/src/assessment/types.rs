//! Types for the assessment engine.

use thiserror::Error;

use crate::decision::{Decision, DecisionCacheEntry, DecisionStoreError};
use crate::metafile::Metafile;
use crate::torrent_cache::TorrentCacheError;

/// The result of assessing one candidate.
#[derive(Debug, Clone)]
pub struct Assessment {
    /// Candidate guid this assessment is for.
    pub guid: String,
    /// The decision cache entry as persisted.
    pub entry: DecisionCacheEntry,
    /// The matched torrent; present iff the decision is `Match`.
    pub metafile: Option<Metafile>,
    /// Whether the decision came from the cache rather than a fresh assessment.
    pub cached: bool,
}

impl Assessment {
    pub fn decision(&self) -> Decision {
        self.entry.decision
    }

    pub fn is_match(&self) -> bool {
        self.entry.decision == Decision::Match
    }
}

/// Fatal assessment failures.
///
/// Rejections are never errors; these only arise when the durable stores
/// cannot be read or written.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Decision store failure: {0}")]
    DecisionStore(#[from] DecisionStoreError),

    #[error("Torrent cache failure: {0}")]
    TorrentCache(#[from] TorrentCacheError),
}
