//! Searchees, indexer candidates and the exclusion set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::metafile::{FileEntry, Metafile};

/// A torrent the user already holds locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Searchee {
    /// Unique logical key; partitions the decision cache.
    pub name: String,
    /// Ordered file tree.
    pub files: Vec<FileEntry>,
}

impl Searchee {
    pub fn new(name: impl Into<String>, files: Vec<FileEntry>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }

    /// Build a searchee from a torrent the user already has.
    pub fn from_metafile(metafile: &Metafile) -> Self {
        Self {
            name: metafile.name.clone(),
            files: metafile.files.clone(),
        }
    }

    /// Sum of all file lengths.
    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

/// One indexer search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultCandidate {
    pub title: String,
    /// Indexer-scoped unique id; the decision cache sub-key.
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_id: Option<i64>,
    /// Size in bytes as reported by the indexer.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
}

impl SearchResultCandidate {
    /// The download link, if present and non-blank.
    pub fn download_link(&self) -> Option<&str> {
        self.download_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

/// Info hashes already present in the user's client or library.
///
/// Lookups are case-insensitive; hashes are stored lowercase.
#[derive(Debug, Clone, Default)]
pub struct InfoHashSet {
    hashes: HashSet<String>,
}

impl InfoHashSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info_hash: &str) -> bool {
        self.hashes.insert(info_hash.trim().to_lowercase())
    }

    pub fn contains(&self, info_hash: &str) -> bool {
        self.hashes.contains(&info_hash.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for InfoHashSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for hash in iter {
            set.insert(hash.as_ref());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_length() {
        let searchee = Searchee::new(
            "Album",
            vec![
                FileEntry::new("Album/01.flac", 100),
                FileEntry::new("Album/02.flac", 250),
            ],
        );
        assert_eq!(searchee.total_length(), 350);
    }

    #[test]
    fn test_blank_download_link_is_absent() {
        let mut candidate = SearchResultCandidate {
            title: "t".to_string(),
            guid: "g".to_string(),
            indexer_id: None,
            size: 1,
            download_link: Some("   ".to_string()),
        };
        assert!(candidate.download_link().is_none());

        candidate.download_link = None;
        assert!(candidate.download_link().is_none());

        candidate.download_link = Some("http://indexer/dl/1".to_string());
        assert_eq!(candidate.download_link(), Some("http://indexer/dl/1"));
    }

    #[test]
    fn test_candidate_minimal_json() {
        let json = r#"{"title": "Some.Release", "guid": "abc", "size": 42}"#;
        let candidate: SearchResultCandidate = serde_json::from_str(json).unwrap();

        assert_eq!(candidate.guid, "abc");
        assert!(candidate.indexer_id.is_none());
        assert!(candidate.download_link.is_none());
    }

    #[test]
    fn test_info_hash_set_is_case_insensitive() {
        let set: InfoHashSet = ["ABCDEF0123"].into_iter().collect();

        assert!(set.contains("abcdef0123"));
        assert!(set.contains("AbCdEf0123"));
        assert!(!set.contains("ffff"));
        assert_eq!(set.len(), 1);
    }
}
