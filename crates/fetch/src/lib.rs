//! Async origin fetching.
//!
//! This crate defines the [`AsyncFetcher`] trait consumed by the rewrite
//! engine. The original design was callback-shaped ("exactly one completion
//! per fetch"); a future gives the same guarantee with a single resolution
//! point, so that's what the trait exposes.

mod cache_control;
pub mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
mod mock;

pub use crate::cache_control::ttl_from_cache_control;
#[cfg(feature = "http")]
pub use crate::http::HttpFetcher;
#[cfg(feature = "mock")]
pub use crate::mock::MockFetcher;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub type FetcherHandle = Arc<dyn AsyncFetcher>;

/// A completed origin response.
///
/// `cache_ttl` is the origin's own freshness declaration, already digested
/// from its `Cache-Control` header: `None` means the origin said nothing,
/// zero means it explicitly declared itself uncacheable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, if the origin sent one.
    pub content_type: Option<String>,
    pub cache_ttl: Option<Duration>,
}

impl FetchResponse {
    /// Whether the response carries a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches a URL, resolving exactly once with the response or an error.
///
/// Implementations do not retry and do not interpret status codes; both are
/// policy that belongs to the caller. Errors are reserved for transfers
/// that never produced a response at all.
#[async_trait]
pub trait AsyncFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}
