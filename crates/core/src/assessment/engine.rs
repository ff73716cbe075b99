//! The assessment engine - one decision per (searchee, candidate).

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, trace, warn};

use super::key_lock::KeyLocks;
use super::policy::{plan, Plan};
use super::{Assessment, EngineError};
use crate::config::MatchingConfig;
use crate::decision::{Decision, DecisionCacheEntry, DecisionStore};
use crate::matching::{file_tree_matches, size_matches};
use crate::metafile::{Metafile, MetafileFetcher};
use crate::searchee::{InfoHashSet, SearchResultCandidate, Searchee};
use crate::torrent_cache::{TorrentCacheError, TorrentFileStore};

/// Decides whether candidates are cross-seedable copies of a searchee,
/// remembering every decision.
///
/// One engine is meant to live for one run: it tracks which keys were
/// fully assessed so that no candidate is fetched twice in the same run.
pub struct AssessmentEngine {
    decisions: Arc<dyn DecisionStore>,
    torrents: Arc<dyn TorrentFileStore>,
    fetcher: Arc<dyn MetafileFetcher>,
    config: MatchingConfig,
    key_locks: KeyLocks,
}

impl AssessmentEngine {
    pub fn new(
        decisions: Arc<dyn DecisionStore>,
        torrents: Arc<dyn TorrentFileStore>,
        fetcher: Arc<dyn MetafileFetcher>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            decisions,
            torrents,
            fetcher,
            config,
            key_locks: KeyLocks::default(),
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Assess one candidate against a searchee.
    ///
    /// The resulting entry is durable before this returns. Errors are only
    /// returned when a store cannot be read or written.
    pub async fn assess(
        &self,
        searchee: &Searchee,
        candidate: &SearchResultCandidate,
        excluded: &InfoHashSet,
    ) -> Result<Assessment, EngineError> {
        let slot = self.key_locks.slot(&searchee.name, &candidate.guid);
        let mut state = slot.lock().await;

        let existing = self.decisions.get(&searchee.name, &candidate.guid)?;

        // A key already fully assessed in this run is not fetched again
        let mut chosen = plan(existing.as_ref(), excluded);
        if chosen == Plan::FullAssessment && state.fully_assessed {
            if let Some(ref entry) = existing {
                chosen = Plan::CachedRejection(entry.decision);
            }
        }

        let (decision, metafile, cached) = match chosen {
            Plan::FullAssessment => {
                state.fully_assessed = true;
                let (decision, metafile) =
                    self.full_assessment(searchee, candidate, excluded).await?;
                (decision, metafile, false)
            }
            Plan::FlipToExisting => (Decision::InfoHashAlreadyExists, None, false),
            Plan::VerifyCachedMatch { info_hash } => match self.cached_metafile(&info_hash)? {
                Some(metafile) => (Decision::Match, Some(metafile), true),
                // Already fetched once this run; the next run retries
                None if state.fully_assessed => {
                    warn!(
                        info_hash = %info_hash,
                        guid = %candidate.guid,
                        "Cached torrent vanished after this run's fetch, deferring to next run"
                    );
                    (Decision::DownloadFailed, None, false)
                }
                None => {
                    state.fully_assessed = true;
                    let (decision, metafile) =
                        self.full_assessment(searchee, candidate, excluded).await?;
                    (decision, metafile, false)
                }
            },
            Plan::CachedRejection(decision) => (decision, None, true),
        };

        let now = Utc::now();
        let info_hash = match (decision, &metafile) {
            (Decision::Match, Some(m)) => Some(m.info_hash.clone()),
            _ => None,
        };
        let entry = match existing {
            Some(ref previous) => previous.observed(decision, info_hash, now),
            None => DecisionCacheEntry::new(decision, info_hash, now),
        };
        self.decisions.put(&searchee.name, &candidate.guid, &entry)?;

        log_outcome(searchee, candidate, decision, cached);

        Ok(Assessment {
            guid: candidate.guid.clone(),
            entry,
            metafile,
            cached,
        })
    }

    /// Assess every candidate for one searchee.
    ///
    /// Up to `max_parallel_fetches` candidates are in flight at once. Results
    /// are in input order; the first fatal error aborts the batch.
    pub async fn assess_all(
        &self,
        searchee: &Searchee,
        candidates: &[SearchResultCandidate],
        excluded: &InfoHashSet,
    ) -> Result<Vec<Assessment>, EngineError> {
        let parallelism = self.config.max_parallel_fetches.max(1);

        stream::iter(candidates)
            .map(|candidate| self.assess(searchee, candidate, excluded))
            .buffered(parallelism)
            .try_collect()
            .await
    }

    /// Size check, link check, fetch, exclusion check, file tree check.
    /// The first failing stage decides.
    async fn full_assessment(
        &self,
        searchee: &Searchee,
        candidate: &SearchResultCandidate,
        excluded: &InfoHashSet,
    ) -> Result<(Decision, Option<Metafile>), EngineError> {
        if !size_matches(candidate.size, searchee, self.config.fuzzy_size_threshold) {
            return Ok((Decision::SizeMismatch, None));
        }

        let Some(link) = candidate.download_link() else {
            return Ok((Decision::NoDownloadLink, None));
        };

        let fetched = tokio::time::timeout(self.config.fetch_timeout(), self.fetcher.fetch(link)).await;
        let metafile = match fetched {
            Ok(Some(metafile)) => metafile,
            Ok(None) => return Ok((Decision::DownloadFailed, None)),
            Err(_) => {
                debug!(
                    guid = %candidate.guid,
                    fetcher = self.fetcher.name(),
                    timeout_secs = self.config.fetch_timeout_secs,
                    "Torrent fetch timed out"
                );
                return Ok((Decision::DownloadFailed, None));
            }
        };

        if excluded.contains(&metafile.info_hash) {
            return Ok((Decision::InfoHashAlreadyExists, None));
        }

        if !file_tree_matches(&metafile.files, &searchee.files) {
            return Ok((Decision::FileTreeMismatch, None));
        }

        self.torrents.write(&metafile)?;
        Ok((Decision::Match, Some(metafile)))
    }

    /// The cached torrent for a previous match, or `None` if it has to be
    /// regenerated.
    fn cached_metafile(&self, info_hash: &str) -> Result<Option<Metafile>, EngineError> {
        if !self.torrents.has(info_hash)? {
            info!(info_hash = %info_hash, "Cached torrent is missing, re-assessing");
            return Ok(None);
        }

        match self.torrents.read(info_hash) {
            Ok(metafile) => Ok(Some(metafile)),
            Err(TorrentCacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(info_hash = %info_hash, "Cached torrent is missing, re-assessing");
                Ok(None)
            }
            Err(e @ TorrentCacheError::Io(_)) => Err(e.into()),
            Err(e) => {
                warn!(info_hash = %info_hash, error = %e, "Cached torrent is unreadable, re-assessing");
                Ok(None)
            }
        }
    }
}

fn log_outcome(
    searchee: &Searchee,
    candidate: &SearchResultCandidate,
    decision: Decision,
    cached: bool,
) {
    match (decision, cached) {
        (Decision::Match, false) => info!(
            guid = %candidate.guid,
            "{} - found match: {}",
            searchee.name,
            candidate.title
        ),
        (Decision::Match, true) => trace!(
            guid = %candidate.guid,
            "{} - cached match: {}",
            searchee.name,
            candidate.title
        ),
        (decision, false) => info!(
            guid = %candidate.guid,
            decision = %decision,
            "{} - no match for {}: {}",
            searchee.name,
            candidate.title,
            decision.reason()
        ),
        (decision, true) => debug!(
            guid = %candidate.guid,
            decision = %decision,
            "{} - no match for {}: {} (cached)",
            searchee.name,
            candidate.title,
            decision.reason()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SqliteDecisionStore;
    use crate::testing::fixtures::{self, TorrentBuilder};
    use crate::testing::MockMetafileFetcher;
    use crate::torrent_cache::DirTorrentFileCache;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        engine: Arc<AssessmentEngine>,
        fetcher: MockMetafileFetcher,
        decisions: Arc<SqliteDecisionStore>,
        torrents: Arc<DirTorrentFileCache>,
        _temp_dir: TempDir,
    }

    fn harness(config: MatchingConfig) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let decisions = Arc::new(SqliteDecisionStore::in_memory().unwrap());
        let torrents = Arc::new(DirTorrentFileCache::open(temp_dir.path()).unwrap());
        let fetcher = MockMetafileFetcher::new();
        let engine = Arc::new(AssessmentEngine::new(
            decisions.clone(),
            torrents.clone(),
            Arc::new(fetcher.clone()),
            config,
        ));
        Harness {
            engine,
            fetcher,
            decisions,
            torrents,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_download_failed() {
        let h = harness(MatchingConfig {
            fetch_timeout_secs: 1,
            ..Default::default()
        });
        let torrent = TorrentBuilder::new("Slow").file("a.bin", 1_000);
        h.fetcher
            .set_response(fixtures::download_link("g"), torrent.metafile())
            .await;
        h.fetcher.set_delay(Duration::from_secs(5)).await;

        let assessment = h
            .engine
            .assess(&torrent.searchee(), &fixtures::candidate("g", 1_000), &InfoHashSet::new())
            .await
            .unwrap();

        assert_eq!(assessment.decision(), Decision::DownloadFailed);
        assert!(!assessment.cached);
    }

    #[tokio::test]
    async fn test_download_failed_is_retried_once_per_run() {
        let h = harness(MatchingConfig::default());
        let torrent = TorrentBuilder::new("Flaky").file("a.bin", 1_000);
        let searchee = torrent.searchee();
        let candidate = fixtures::candidate("g", 1_000);

        let first = h
            .engine
            .assess(&searchee, &candidate, &InfoHashSet::new())
            .await
            .unwrap();
        let second = h
            .engine
            .assess(&searchee, &candidate, &InfoHashSet::new())
            .await
            .unwrap();

        assert_eq!(first.decision(), Decision::DownloadFailed);
        assert_eq!(second.decision(), Decision::DownloadFailed);
        assert!(second.cached);
        assert_eq!(h.fetcher.fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_key_fetch_once() {
        let h = harness(MatchingConfig::default());
        let torrent = TorrentBuilder::new("Show").file("e01.mkv", 5_000);
        let searchee = torrent.searchee();
        let candidate = fixtures::candidate("g", 5_000);
        h.fetcher
            .set_response(fixtures::download_link("g"), torrent.metafile())
            .await;
        h.fetcher.set_delay(Duration::from_millis(20)).await;

        let excluded = InfoHashSet::new();
        let (a, b) = tokio::join!(
            h.engine.assess(&searchee, &candidate, &excluded),
            h.engine.assess(&searchee, &candidate, &excluded),
        );

        assert!(a.unwrap().is_match());
        assert!(b.unwrap().is_match());
        assert_eq!(h.fetcher.fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_assess_all_keeps_input_order() {
        let h = harness(MatchingConfig {
            max_parallel_fetches: 3,
            ..Default::default()
        });
        let torrent = TorrentBuilder::new("Album").file("01.flac", 10_000);
        let searchee = torrent.searchee();
        h.fetcher
            .set_response(fixtures::download_link("match"), torrent.metafile())
            .await;

        let mut no_link = fixtures::candidate("nolink", 10_000);
        no_link.download_link = None;
        let candidates = vec![
            fixtures::candidate("toosmall", 10),
            fixtures::candidate("match", 10_000),
            no_link,
            fixtures::candidate("broken", 10_000),
        ];

        let results = h
            .engine
            .assess_all(&searchee, &candidates, &InfoHashSet::new())
            .await
            .unwrap();

        let decisions: Vec<_> = results.iter().map(|a| a.decision()).collect();
        assert_eq!(
            decisions,
            vec![
                Decision::SizeMismatch,
                Decision::Match,
                Decision::NoDownloadLink,
                Decision::DownloadFailed,
            ]
        );
        let guids: Vec<_> = results.iter().map(|a| a.guid.as_str()).collect();
        assert_eq!(guids, vec!["toosmall", "match", "nolink", "broken"]);
        assert_eq!(h.decisions.entries_for("Album").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_excluded_fresh_candidate_is_not_cached_as_match() {
        let h = harness(MatchingConfig::default());
        let torrent = TorrentBuilder::new("Owned").file("a.bin", 1_000);
        let metafile = torrent.metafile();
        h.fetcher
            .set_response(fixtures::download_link("g"), metafile.clone())
            .await;
        let excluded: InfoHashSet = [metafile.info_hash.as_str()].into_iter().collect();

        let assessment = h
            .engine
            .assess(&torrent.searchee(), &fixtures::candidate("g", 1_000), &excluded)
            .await
            .unwrap();

        assert_eq!(assessment.decision(), Decision::InfoHashAlreadyExists);
        assert!(assessment.entry.info_hash.is_none());
        assert!(assessment.metafile.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_torrent_from_several_guids_concurrently() {
        let h = harness(MatchingConfig::default());
        let torrent = TorrentBuilder::new("Release").file("a.mkv", 7_000);
        let searchee = torrent.searchee();
        let guids: Vec<String> = (0..4).map(|i| format!("g{}", i)).collect();
        for guid in &guids {
            h.fetcher
                .set_response(fixtures::download_link(guid), torrent.metafile())
                .await;
        }

        let tasks: Vec<_> = guids
            .iter()
            .map(|guid| {
                let engine = Arc::clone(&h.engine);
                let searchee = searchee.clone();
                let candidate = fixtures::candidate(guid, 7_000);
                tokio::spawn(async move {
                    engine
                        .assess(&searchee, &candidate, &InfoHashSet::new())
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().unwrap().is_match());
        }
        assert_eq!(h.decisions.entries_for("Release").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_vanished_cache_is_not_refetched_in_same_run() {
        let h = harness(MatchingConfig::default());
        let torrent = TorrentBuilder::new("Album").file("01.flac", 3_000);
        let searchee = torrent.searchee();
        let candidate = fixtures::candidate("g", 3_000);
        let metafile = torrent.metafile();
        h.fetcher
            .set_response(fixtures::download_link("g"), metafile.clone())
            .await;

        let first = h
            .engine
            .assess(&searchee, &candidate, &InfoHashSet::new())
            .await
            .unwrap();
        assert!(first.is_match());

        std::fs::remove_file(h.torrents.path_for(&metafile.info_hash)).unwrap();

        let second = h
            .engine
            .assess(&searchee, &candidate, &InfoHashSet::new())
            .await
            .unwrap();

        assert_eq!(second.decision(), Decision::DownloadFailed);
        assert!(second.metafile.is_none());
        assert_eq!(h.fetcher.fetch_count().await, 1);

        let stored = h.decisions.get("Album", "g").unwrap().unwrap();
        assert_eq!(stored.decision, Decision::DownloadFailed);
        assert_eq!(stored.info_hash.as_deref(), Some(metafile.info_hash.as_str()));
    }
}
