//! Metafile fetcher - resolves a candidate's download link into a [`Metafile`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::{parse_metafile, Metafile};

/// Errors that can occur while fetching a .torrent file.
///
/// These never reach the assessment engine; [`MetafileFetcher::fetch`]
/// collapses every failure into `None`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout fetching torrent")]
    Timeout,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Resolves download links into parsed torrent metainfo.
#[async_trait]
pub trait MetafileFetcher: Send + Sync {
    /// Fetcher name for logging.
    fn name(&self) -> &str;

    /// Download and parse the torrent behind `url`.
    ///
    /// Returns `None` on any network or parse failure.
    async fn fetch(&self, url: &str) -> Option<Metafile>;
}

/// Fetches .torrent files over HTTP(S).
pub struct HttpMetafileFetcher {
    http_client: Client,
}

impl HttpMetafileFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http_client })
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<Metafile, FetchError> {
        debug!(url = %url, "Fetching .torrent file");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        parse_metafile(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MetafileFetcher for HttpMetafileFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Option<Metafile> {
        match self.fetch_and_parse(url).await {
            Ok(metafile) => Some(metafile),
            Err(e) => {
                debug!(url = %url, error = %e, "Failed to fetch torrent");
                None
            }
        }
    }
}
