//! File tree comparison.
//!
//! A candidate matches when every one of its files has an identical
//! `(path, length)` counterpart in the searchee. The check is one-way: the
//! searchee may hold files the candidate lacks and still match. Paths are
//! compared byte for byte, without separator or case normalisation.

use std::collections::HashSet;

use crate::metafile::FileEntry;

/// Whether `candidate` is a subset of `searchee` by exact `(path, length)`.
pub fn file_tree_matches(candidate: &[FileEntry], searchee: &[FileEntry]) -> bool {
    let available: HashSet<(&str, u64)> = searchee
        .iter()
        .map(|f| (f.path.as_str(), f.length))
        .collect();

    candidate
        .iter()
        .all(|f| available.contains(&(f.path.as_str(), f.length)))
}
