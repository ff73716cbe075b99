//! Mock metafile fetcher for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::metafile::{Metafile, MetafileFetcher};

/// Mock implementation of the MetafileFetcher trait.
///
/// Unknown URLs fail (return `None`). Every call is recorded.
#[derive(Clone, Default)]
pub struct MockMetafileFetcher {
    /// Configured responses by URL.
    responses: Arc<RwLock<HashMap<String, Metafile>>>,
    /// Recorded fetch URLs, in call order.
    fetches: Arc<RwLock<Vec<String>>>,
    /// Simulated latency per fetch.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl std::fmt::Debug for MockMetafileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMetafileFetcher")
            .field("responses", &"<responses>")
            .field("fetches", &"<fetches>")
            .finish()
    }
}

impl MockMetafileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `metafile` for `url`.
    pub async fn set_response(&self, url: impl Into<String>, metafile: Metafile) {
        self.responses.write().await.insert(url.into(), metafile);
    }

    /// Make `url` fail from now on.
    pub async fn remove_response(&self, url: &str) {
        self.responses.write().await.remove(url);
    }

    /// Delay every fetch by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// URLs fetched so far.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    pub async fn clear_fetches(&self) {
        self.fetches.write().await.clear();
    }
}

#[async_trait]
impl MetafileFetcher for MockMetafileFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Option<Metafile> {
        self.fetches.write().await.push(url.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses.read().await.get(url).cloned()
    }
}
