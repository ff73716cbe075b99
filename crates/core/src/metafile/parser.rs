//! Torrent file parser - turns bencoded .torrent bytes into a [`Metafile`].
//!
//! Uses librqbit-core to parse the metainfo and compute the v1 info hash.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use thiserror::Error;

use super::{FileEntry, Metafile};

/// Errors that can occur when parsing torrent files.
#[derive(Debug, Error)]
pub enum MetafileError {
    #[error("Failed to parse torrent: {0}")]
    Parse(String),

    #[error("Empty torrent (no files)")]
    EmptyTorrent,
}

/// Parse raw .torrent bytes into a [`Metafile`].
///
/// Multi-file torrents produce paths of the form `name/dir/file`; a
/// single-file torrent produces one entry whose path is the torrent name.
/// The raw bytes are kept so the torrent can be cached verbatim.
pub fn parse_metafile(bytes: &[u8]) -> Result<Metafile, MetafileError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| MetafileError::Parse(e.to_string()))?;

    let info = &torrent.info;

    let name = info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .unwrap_or_else(|| "unknown".to_string());

    let files = if let Some(ref files) = info.files {
        let mut result = Vec::with_capacity(files.len());
        for file in files {
            let mut parts = Vec::with_capacity(file.path.len() + 1);
            parts.push(name.clone());
            for part in &file.path {
                parts.push(bytes_to_string(part.as_ref()));
            }
            result.push(FileEntry {
                path: parts.join("/"),
                length: file.length,
            });
        }
        result
    } else if let Some(length) = info.length {
        vec![FileEntry {
            path: name.clone(),
            length,
        }]
    } else {
        Vec::new()
    };

    if files.is_empty() {
        return Err(MetafileError::EmptyTorrent);
    }

    Ok(Metafile {
        info_hash: torrent.info_hash.as_string().to_lowercase(),
        name,
        files,
        raw: bytes.to_vec(),
    })
}

/// Torrent names and paths are not guaranteed to be UTF-8; decode lossily.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TorrentBuilder;

    #[test]
    fn test_parse_invalid_torrent() {
        let result = parse_metafile(b"not a valid torrent");
        assert!(matches!(result, Err(MetafileError::Parse(_))));
    }

    #[test]
    fn test_parse_empty_data() {
        assert!(parse_metafile(b"").is_err());
    }

    #[test]
    fn test_parse_multi_file_torrent() {
        let bytes = TorrentBuilder::new("Album")
            .file("01 - Intro.flac", 1000)
            .file("CD2/02 - Outro.flac", 2000)
            .build();

        let metafile = parse_metafile(&bytes).unwrap();

        assert_eq!(metafile.name, "Album");
        assert_eq!(metafile.info_hash.len(), 40);
        assert_eq!(metafile.files.len(), 2);
        assert_eq!(metafile.files[0].path, "Album/01 - Intro.flac");
        assert_eq!(metafile.files[0].length, 1000);
        assert_eq!(metafile.files[1].path, "Album/CD2/02 - Outro.flac");
        assert_eq!(metafile.total_length(), 3000);
        assert_eq!(metafile.raw, bytes);
    }

    #[test]
    fn test_parse_single_file_torrent() {
        let bytes = TorrentBuilder::single_file("movie.mkv", 4096).build();

        let metafile = parse_metafile(&bytes).unwrap();

        assert_eq!(metafile.files.len(), 1);
        assert_eq!(metafile.files[0].path, "movie.mkv");
        assert_eq!(metafile.files[0].length, 4096);
    }

    #[test]
    fn test_info_hash_depends_on_info_dict() {
        let a = TorrentBuilder::new("Same").file("a.bin", 10).build();
        let b = TorrentBuilder::new("Same")
            .file("a.bin", 10)
            .source("OTHER")
            .build();

        let a = parse_metafile(&a).unwrap();
        let b = parse_metafile(&b).unwrap();

        assert_eq!(a.files, b.files);
        assert_ne!(a.info_hash, b.info_hash);
    }

    #[test]
    fn test_bytes_to_string_invalid_utf8() {
        let invalid = vec![0xff, 0xfe, 0x68, 0x65, 0x6c, 0x6c, 0x6f];
        let result = bytes_to_string(&invalid);
        assert!(result.contains("hello"));
    }
}
