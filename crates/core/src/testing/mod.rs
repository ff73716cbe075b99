//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedmatch_core::testing::{fixtures::TorrentBuilder, MockMetafileFetcher};
//!
//! let torrent = TorrentBuilder::new("Album").file("01.flac", 1000).metafile();
//! let fetcher = MockMetafileFetcher::new();
//! fetcher.set_response("http://indexer/dl/1", torrent).await;
//!
//! // Hand the fetcher to an AssessmentEngine...
//! assert_eq!(fetcher.fetch_count().await, 0);
//! ```

mod mock_fetcher;

pub use mock_fetcher::MockMetafileFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::metafile::{FileEntry, Metafile};
    use crate::searchee::{SearchResultCandidate, Searchee};

    const PIECE_LENGTH: u64 = 1 << 20;

    /// Builds bencoded v1 .torrent files.
    #[derive(Debug, Clone)]
    pub struct TorrentBuilder {
        name: String,
        files: Vec<(String, u64)>,
        single_length: Option<u64>,
        source: Option<String>,
    }

    impl TorrentBuilder {
        /// A multi-file torrent rooted at `name`.
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                files: Vec::new(),
                single_length: None,
                source: None,
            }
        }

        /// A single-file torrent.
        pub fn single_file(name: &str, length: u64) -> Self {
            Self {
                single_length: Some(length),
                ..Self::new(name)
            }
        }

        /// Add a file; `path` is relative to the torrent root, `/`-separated.
        pub fn file(mut self, path: &str, length: u64) -> Self {
            self.files.push((path.to_string(), length));
            self
        }

        /// Set the private-tracker `source` tag, which changes the info hash.
        pub fn source(mut self, source: &str) -> Self {
            self.source = Some(source.to_string());
            self
        }

        fn total_length(&self) -> u64 {
            self.single_length
                .unwrap_or_else(|| self.files.iter().map(|(_, l)| l).sum())
        }

        /// Encode as .torrent bytes.
        pub fn build(&self) -> Vec<u8> {
            let mut info = Vec::new();
            info.push(b'd');
            match self.single_length {
                Some(length) => {
                    bytes(&mut info, b"length");
                    int(&mut info, length);
                }
                None => {
                    bytes(&mut info, b"files");
                    info.push(b'l');
                    for (path, length) in &self.files {
                        info.push(b'd');
                        bytes(&mut info, b"length");
                        int(&mut info, *length);
                        bytes(&mut info, b"path");
                        info.push(b'l');
                        for part in path.split('/') {
                            bytes(&mut info, part.as_bytes());
                        }
                        info.push(b'e');
                        info.push(b'e');
                    }
                    info.push(b'e');
                }
            }
            bytes(&mut info, b"name");
            bytes(&mut info, self.name.as_bytes());
            bytes(&mut info, b"piece length");
            int(&mut info, PIECE_LENGTH);
            let pieces = self.total_length().div_ceil(PIECE_LENGTH).max(1) as usize;
            bytes(&mut info, b"pieces");
            bytes(&mut info, &vec![0xab; pieces * 20]);
            if let Some(ref source) = self.source {
                bytes(&mut info, b"source");
                bytes(&mut info, source.as_bytes());
            }
            info.push(b'e');

            let mut out = Vec::new();
            out.push(b'd');
            bytes(&mut out, b"announce");
            bytes(&mut out, b"http://tracker.invalid/announce");
            bytes(&mut out, b"info");
            out.extend_from_slice(&info);
            out.push(b'e');
            out
        }

        /// Encode and parse into a [`Metafile`].
        pub fn metafile(&self) -> Metafile {
            Metafile::from_bytes(&self.build()).expect("fixture torrent should parse")
        }

        /// A searchee holding exactly this torrent's files.
        pub fn searchee(&self) -> Searchee {
            let files = match self.single_length {
                Some(length) => vec![FileEntry::new(self.name.clone(), length)],
                None => self
                    .files
                    .iter()
                    .map(|(path, length)| FileEntry::new(format!("{}/{}", self.name, path), *length))
                    .collect(),
            };
            Searchee::new(self.name.clone(), files)
        }
    }

    fn bytes(out: &mut Vec<u8>, value: &[u8]) {
        out.extend_from_slice(value.len().to_string().as_bytes());
        out.push(b':');
        out.extend_from_slice(value);
    }

    fn int(out: &mut Vec<u8>, value: u64) {
        out.push(b'i');
        out.extend_from_slice(value.to_string().as_bytes());
        out.push(b'e');
    }

    /// A candidate with a download link pointing at `http://indexer.test/dl/<guid>`.
    pub fn candidate(guid: &str, size: u64) -> SearchResultCandidate {
        SearchResultCandidate {
            title: format!("Release {}", guid),
            guid: guid.to_string(),
            indexer_id: Some(1),
            size,
            download_link: Some(download_link(guid)),
        }
    }

    /// The download link [`candidate`] uses for `guid`.
    pub fn download_link(guid: &str) -> String {
        format!("http://indexer.test/dl/{}", guid)
    }
}
