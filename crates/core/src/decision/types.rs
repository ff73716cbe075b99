//! Types for the decision cache.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of assessing one candidate against one searchee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Match,
    SizeMismatch,
    NoDownloadLink,
    DownloadFailed,
    InfoHashAlreadyExists,
    FileTreeMismatch,
}

impl Decision {
    pub const ALL: [Decision; 6] = [
        Decision::Match,
        Decision::SizeMismatch,
        Decision::NoDownloadLink,
        Decision::DownloadFailed,
        Decision::InfoHashAlreadyExists,
        Decision::FileTreeMismatch,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Match => "MATCH",
            Decision::SizeMismatch => "SIZE_MISMATCH",
            Decision::NoDownloadLink => "NO_DOWNLOAD_LINK",
            Decision::DownloadFailed => "DOWNLOAD_FAILED",
            Decision::InfoHashAlreadyExists => "INFO_HASH_ALREADY_EXISTS",
            Decision::FileTreeMismatch => "FILE_TREE_MISMATCH",
        }
    }

    /// Only a failed download is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Decision::DownloadFailed)
    }

    /// Human-readable reason for log output.
    pub fn reason(&self) -> &'static str {
        match self {
            Decision::Match => "matched",
            Decision::SizeMismatch => "its size does not match",
            Decision::NoDownloadLink => "it has no download link",
            Decision::DownloadFailed => "the torrent file failed to download",
            Decision::InfoHashAlreadyExists => "its info hash is already in your client",
            Decision::FileTreeMismatch => "it has a different file tree",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = DecisionStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decision::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| DecisionStoreError::Corrupt(format!("unknown decision: {}", s)))
    }
}

/// The last decision reached for a (searchee, candidate) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionCacheEntry {
    pub decision: Decision,
    /// Set once, when the entry is created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub first_seen: DateTime<Utc>,
    /// Updated on every observation.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: DateTime<Utc>,
    /// Present once the pair has ever matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}

impl DecisionCacheEntry {
    /// A brand-new entry observed at `now`.
    pub fn new(decision: Decision, info_hash: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            decision,
            first_seen: now,
            last_seen: now,
            info_hash,
        }
    }

    /// This entry re-observed at `now` with a (possibly) new decision.
    ///
    /// Keeps `first_seen`, and keeps the previously recorded info hash
    /// unless a new one is supplied.
    pub fn observed(&self, decision: Decision, info_hash: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            decision,
            first_seen: self.first_seen,
            last_seen: now.max(self.first_seen),
            info_hash: info_hash.or_else(|| self.info_hash.clone()),
        }
    }
}

/// The durable document shape: searchee name → candidate guid → entry.
pub type DecisionDocument = BTreeMap<String, BTreeMap<String, DecisionCacheEntry>>;

/// Decision cache statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionStats {
    /// Total entries.
    pub total_entries: u64,
    /// Distinct searchees with at least one entry.
    pub searchees: u64,
    /// Entry count per decision, keyed by stored representation.
    pub by_decision: BTreeMap<String, u64>,
}

/// Errors for decision store operations.
///
/// All of these are fatal to an assessment run.
#[derive(Debug, Error)]
pub enum DecisionStoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt decision entry: {0}")]
    Corrupt(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for DecisionStoreError {
    fn from(e: rusqlite::Error) -> Self {
        DecisionStoreError::Database(e.to_string())
    }
}
