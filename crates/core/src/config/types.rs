use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// Match assessment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Fractional size tolerance for the size pre-filter (default: 0.02)
    #[serde(default = "default_fuzzy_size_threshold")]
    pub fuzzy_size_threshold: f64,
    /// Upper bound on a single .torrent fetch in seconds (default: 30)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Candidates assessed concurrently (default: 1, sequential)
    #[serde(default = "default_max_parallel_fetches")]
    pub max_parallel_fetches: usize,
}

impl MatchingConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_size_threshold: default_fuzzy_size_threshold(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_parallel_fetches: default_max_parallel_fetches(),
        }
    }
}

fn default_fuzzy_size_threshold() -> f64 {
    0.02
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_parallel_fetches() -> usize {
    1
}

/// Storage locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database holding the decision cache
    #[serde(default = "default_decision_db")]
    pub decision_db: PathBuf,
    /// Directory holding cached .torrent files of confirmed matches
    #[serde(default = "default_torrent_cache_dir")]
    pub torrent_cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            decision_db: default_decision_db(),
            torrent_cache_dir: default_torrent_cache_dir(),
        }
    }
}

fn default_decision_db() -> PathBuf {
    PathBuf::from("seedmatch.db")
}

fn default_torrent_cache_dir() -> PathBuf {
    PathBuf::from("torrent_cache")
}

/// Search pacing (applied by the caller between indexer queries)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Pause between searchees in seconds (default: 10)
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl SearchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
        }
    }
}

fn default_delay_secs() -> u64 {
    10
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("seedmatch/", env!("CARGO_PKG_VERSION")).to_string()
}
