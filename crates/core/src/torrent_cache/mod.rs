//! Torrent file cache - raw metainfo bytes for every confirmed match.
//!
//! Keyed by info hash. Entries are never evicted.

mod dir_store;

pub use dir_store::DirTorrentFileCache;

use thiserror::Error;

use crate::metafile::{Metafile, MetafileError};

/// Errors for torrent file cache operations.
#[derive(Debug, Error)]
pub enum TorrentCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cached torrent is unreadable: {0}")]
    Parse(#[from] MetafileError),

    #[error("Cached torrent hash mismatch: expected {expected}, found {actual}")]
    InfoHashMismatch { expected: String, actual: String },
}

/// Trait for torrent file cache storage.
pub trait TorrentFileStore: Send + Sync {
    /// Whether bytes for `info_hash` are stored.
    fn has(&self, info_hash: &str) -> Result<bool, TorrentCacheError>;

    /// Load and re-parse the stored torrent for `info_hash`.
    fn read(&self, info_hash: &str) -> Result<Metafile, TorrentCacheError>;

    /// Persist the metafile's raw bytes under its info hash.
    ///
    /// Writing the same info hash again overwrites with identical content.
    fn write(&self, metafile: &Metafile) -> Result<(), TorrentCacheError>;
}
