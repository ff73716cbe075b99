//! Parsed torrent metainfo and the fetcher that resolves download links to it.

mod fetcher;
mod parser;

pub use fetcher::{FetchError, HttpMetafileFetcher, MetafileFetcher};
pub use parser::{parse_metafile, MetafileError};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A file within a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative path, `/`-separated, rooted at the torrent name.
    pub path: String,
    /// Size in bytes.
    pub length: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, length: u64) -> Self {
        Self {
            path: path.into(),
            length,
        }
    }
}

/// Parsed torrent metainfo.
#[derive(Clone, PartialEq, Eq)]
pub struct Metafile {
    /// v1 info hash, lowercase hex.
    pub info_hash: String,
    /// Torrent name (root folder or single file name).
    pub name: String,
    /// Ordered file tree.
    pub files: Vec<FileEntry>,
    /// The bencoded bytes this metafile was parsed from.
    pub raw: Vec<u8>,
}

impl Metafile {
    /// Parse raw .torrent bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetafileError> {
        parse_metafile(bytes)
    }

    /// Sum of all file lengths.
    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

impl fmt::Debug for Metafile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metafile")
            .field("info_hash", &self.info_hash)
            .field("name", &self.name)
            .field("files", &self.files)
            .field("raw", &format_args!("<{} bytes>", self.raw.len()))
            .finish()
    }
}
