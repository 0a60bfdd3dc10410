//! HTTP fetcher backed by reqwest.

use crate::error::{ErrorKind, Result};
use crate::{AsyncFetcher, FetchResponse, ttl_from_cache_control};
use async_trait::async_trait;
use exn::ResultExt;
use std::time::Duration;
use tracing::debug;

/// [`AsyncFetcher`] over a shared [`reqwest::Client`].
///
/// Deliberately thin: no retries, no redirect policy tweaks, no status
/// interpretation. The rewrite engine decides what a 404 or a short TTL
/// means; this type only moves bytes.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Transport("building http client".to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (e.g. one shared with other subsystems).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AsyncFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send().await.map_err(|err| {
            let kind = if err.is_timeout() {
                ErrorKind::Timeout(url.to_string())
            } else if err.is_builder() {
                // The request never left the process; the URL itself is bad.
                ErrorKind::InvalidUrl(url.to_string())
            } else {
                ErrorKind::Transport(url.to_string())
            };
            exn::Exn::from(kind)
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let cache_ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(ttl_from_cache_control);
        let bytes = response
            .bytes()
            .await
            .or_raise(|| ErrorKind::Transport(url.to_string()))?
            .to_vec();
        debug!(url, status, size = bytes.len(), "fetched origin resource");

        Ok(FetchResponse { status, bytes, content_type, cache_ttl })
    }
}
