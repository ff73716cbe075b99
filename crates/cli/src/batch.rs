//! Batch input for the `assess` command.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use seedmatch_core::{
    Assessment, AssessmentEngine, Decision, InfoHashSet, SearchResultCandidate, Searchee,
};

/// A batch of searchees with the search results found for each.
#[derive(Debug, Deserialize)]
pub struct BatchInput {
    /// Info hashes already in the user's client.
    #[serde(default)]
    pub excluded_info_hashes: Vec<String>,
    pub jobs: Vec<BatchJob>,
}

#[derive(Debug, Deserialize)]
pub struct BatchJob {
    pub searchee: Searchee,
    #[serde(default)]
    pub candidates: Vec<SearchResultCandidate>,
}

/// One line of `assess` output.
#[derive(Debug, Serialize)]
pub struct AssessmentLine<'a> {
    pub searchee: &'a str,
    pub guid: &'a str,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<&'a str>,
    pub cached: bool,
}

impl<'a> AssessmentLine<'a> {
    fn new(searchee: &'a Searchee, assessment: &'a Assessment) -> Self {
        Self {
            searchee: &searchee.name,
            guid: &assessment.guid,
            decision: assessment.decision(),
            info_hash: assessment.metafile.as_ref().map(|m| m.info_hash.as_str()),
            cached: assessment.cached,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub searchees: usize,
    pub candidates: usize,
    pub matches: usize,
}

/// Assess every job, writing one JSON line per candidate to `out`.
///
/// Pauses for `delay` between searchees.
pub async fn run_batch<W: Write>(
    engine: &AssessmentEngine,
    input: &BatchInput,
    delay: Duration,
    out: &mut W,
) -> Result<BatchSummary> {
    let excluded: InfoHashSet = input.excluded_info_hashes.iter().collect();
    let mut summary = BatchSummary::default();

    for (index, job) in input.jobs.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!(
            searchee = %job.searchee.name,
            candidates = job.candidates.len(),
            "Assessing searchee"
        );

        let assessments = engine
            .assess_all(&job.searchee, &job.candidates, &excluded)
            .await
            .with_context(|| format!("Failed to assess {}", job.searchee.name))?;

        for assessment in &assessments {
            let line = AssessmentLine::new(&job.searchee, assessment);
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
            if assessment.is_match() {
                summary.matches += 1;
            }
        }

        summary.searchees += 1;
        summary.candidates += assessments.len();
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use seedmatch_core::testing::{fixtures, fixtures::TorrentBuilder, MockMetafileFetcher};
    use seedmatch_core::{DirTorrentFileCache, MatchingConfig, SqliteDecisionStore};
    use tempfile::TempDir;

    #[test]
    fn test_parse_batch_input() {
        let json = r#"{
            "excluded_info_hashes": ["ABC"],
            "jobs": [{
                "searchee": {"name": "Album", "files": [{"path": "Album/01.flac", "length": 100}]},
                "candidates": [{"title": "Album FLAC", "guid": "g1", "size": 100, "download_link": "http://x/1"}]
            }]
        }"#;

        let input: BatchInput = serde_json::from_str(json).unwrap();

        assert_eq!(input.excluded_info_hashes, vec!["ABC".to_string()]);
        assert_eq!(input.jobs[0].searchee.total_length(), 100);
        assert_eq!(input.jobs[0].candidates[0].download_link(), Some("http://x/1"));
    }

    #[tokio::test]
    async fn test_run_batch_writes_one_line_per_candidate() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = MockMetafileFetcher::new();
        let torrent = TorrentBuilder::new("Album").file("01.flac", 100);
        fetcher
            .set_response(fixtures::download_link("g1"), torrent.metafile())
            .await;

        let engine = AssessmentEngine::new(
            Arc::new(SqliteDecisionStore::in_memory().unwrap()),
            Arc::new(DirTorrentFileCache::open(temp_dir.path()).unwrap()),
            Arc::new(fetcher),
            MatchingConfig::default(),
        );
        let input = BatchInput {
            excluded_info_hashes: Vec::new(),
            jobs: vec![
                BatchJob {
                    searchee: torrent.searchee(),
                    candidates: vec![fixtures::candidate("g1", 100), fixtures::candidate("g2", 5)],
                },
                BatchJob {
                    searchee: TorrentBuilder::new("Empty").file("x", 1).searchee(),
                    candidates: Vec::new(),
                },
            ],
        };

        let mut out = Vec::new();
        let summary = run_batch(&engine, &input, Duration::ZERO, &mut out)
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                searchees: 2,
                candidates: 2,
                matches: 1
            }
        );
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["decision"], "MATCH");
        assert_eq!(lines[0]["cached"], false);
        assert!(lines[0]["info_hash"].is_string());
        assert_eq!(lines[1]["decision"], "SIZE_MISMATCH");
        assert!(lines[1].get("info_hash").is_none());
    }
}
