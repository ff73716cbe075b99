//! Directory-backed torrent file cache: one `<infohash>.cached.torrent` per entry.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{TorrentCacheError, TorrentFileStore};
use crate::metafile::Metafile;

const EXTENSION: &str = "cached.torrent";

pub struct DirTorrentFileCache {
    dir: PathBuf,
}

impl DirTorrentFileCache {
    /// Open the cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TorrentCacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the cached file for `info_hash`.
    pub fn path_for(&self, info_hash: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", info_hash.to_lowercase(), EXTENSION))
    }
}

impl TorrentFileStore for DirTorrentFileCache {
    fn has(&self, info_hash: &str) -> Result<bool, TorrentCacheError> {
        Ok(self.path_for(info_hash).try_exists()?)
    }

    fn read(&self, info_hash: &str) -> Result<Metafile, TorrentCacheError> {
        let bytes = fs::read(self.path_for(info_hash))?;
        let metafile = Metafile::from_bytes(&bytes)?;

        if !metafile.info_hash.eq_ignore_ascii_case(info_hash) {
            return Err(TorrentCacheError::InfoHashMismatch {
                expected: info_hash.to_lowercase(),
                actual: metafile.info_hash,
            });
        }

        Ok(metafile)
    }

    fn write(&self, metafile: &Metafile) -> Result<(), TorrentCacheError> {
        let path = self.path_for(&metafile.info_hash);

        // Each writer gets its own temp file; concurrent writers of one hash
        // each rename identical bytes into place.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&metafile.raw)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(
            info_hash = %metafile.info_hash,
            path = %path.display(),
            "Cached torrent file"
        );
        Ok(())
    }
}
