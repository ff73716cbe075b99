pub mod assessment;
pub mod config;
pub mod decision;
pub mod matching;
pub mod metafile;
pub mod searchee;
pub mod testing;
pub mod torrent_cache;

pub use assessment::{Assessment, AssessmentEngine, EngineError};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, FetcherConfig, MatchingConfig, SearchConfig, StorageConfig,
};
pub use decision::{
    Decision, DecisionCacheEntry, DecisionDocument, DecisionStats, DecisionStore,
    DecisionStoreError, SqliteDecisionStore,
};
pub use matching::{file_tree_matches, size_matches};
pub use metafile::{FetchError, FileEntry, HttpMetafileFetcher, Metafile, MetafileError, MetafileFetcher};
pub use searchee::{InfoHashSet, SearchResultCandidate, Searchee};
pub use torrent_cache::{DirTorrentFileCache, TorrentCacheError, TorrentFileStore};
