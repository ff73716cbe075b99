//! Staleness and retry policy for cached decisions.

use crate::decision::{Decision, DecisionCacheEntry};
use crate::searchee::InfoHashSet;

/// What to do for a (searchee, candidate) pair given its cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run size check, fetch, exclusion check and file tree comparison.
    FullAssessment,
    /// A previous match whose info hash is now held; flip without fetching.
    FlipToExisting,
    /// A previous match; reuse it if the cached torrent is still on disk.
    VerifyCachedMatch { info_hash: String },
    /// A settled rejection, returned verbatim.
    CachedRejection(Decision),
}

/// Choose a plan from the current cache entry and exclusion set.
pub fn plan(entry: Option<&DecisionCacheEntry>, excluded: &InfoHashSet) -> Plan {
    let Some(entry) = entry else {
        return Plan::FullAssessment;
    };

    match entry.decision {
        Decision::DownloadFailed => Plan::FullAssessment,
        Decision::Match => match entry.info_hash {
            Some(ref info_hash) if excluded.contains(info_hash) => Plan::FlipToExisting,
            Some(ref info_hash) => Plan::VerifyCachedMatch {
                info_hash: info_hash.clone(),
            },
            // A match without its hash cannot be verified
            None => Plan::FullAssessment,
        },
        decision => Plan::CachedRejection(decision),
    }
}
