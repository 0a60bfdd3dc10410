//! Programmable fetcher for testing.

use crate::error::{ErrorKind, Result};
use crate::{AsyncFetcher, FetchResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory [`AsyncFetcher`] for tests.
///
/// Maps absolute URLs to canned responses and counts how many times each
/// URL was actually fetched, so tests can pin the at-most-one-fetch
/// invariant. An optional artificial delay makes concurrent fetches
/// overlap deterministically.
///
/// Fetching a URL with no canned response is a transport error, same as a
/// host that doesn't resolve.
///
/// # Examples
///
/// ```
/// use presto_fetch::{AsyncFetcher, MockFetcher};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = MockFetcher::default()
///     .with_resource("http://test.com/a.css", b".blue { color: blue; }", "text/css", 100);
/// let response = fetcher.fetch("http://test.com/a.css").await?;
/// assert_eq!(response.cache_ttl, Some(Duration::from_secs(100)));
/// assert_eq!(fetcher.fetch_count("http://test.com/a.css"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, FetchResponse>>,
    counts: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    /// Register a full canned response for a URL.
    pub fn with_response(self, url: impl Into<String>, response: FetchResponse) -> Self {
        self.responses.lock().unwrap().insert(url.into(), response);
        self
    }

    /// Register a successful cacheable resource: 200, the given bytes, and
    /// a `Cache-Control: max-age={ttl_seconds}`-equivalent TTL.
    pub fn with_resource(
        self,
        url: impl Into<String>,
        bytes: &[u8],
        content_type: &str,
        ttl_seconds: u64,
    ) -> Self {
        self.with_response(url, FetchResponse {
            status: 200,
            bytes: bytes.to_vec(),
            content_type: Some(content_type.to_string()),
            cache_ttl: Some(Duration::from_secs(ttl_seconds)),
        })
    }

    /// Register a URL that responds with the given non-body status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_response(url, FetchResponse {
            status,
            bytes: Vec::new(),
            content_type: None,
            cache_ttl: None,
        })
    }

    /// Delay every fetch by `delay`, forcing concurrent callers to overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `url` has actually been fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AsyncFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        *self.counts.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(url).cloned();
        response.ok_or_else(|| exn::Exn::from(ErrorKind::Transport(url.to_string())))
    }
}
