//! Input and output resource descriptors.

use presto_naming::{ContentKind, ResourceName};
use std::time::Duration;

/// Terminal outcome of an origin fetch.
///
/// There is no pending variant: a descriptor only exists once its fetch has
/// resolved, and late requesters share the resolved descriptor rather than
/// observing intermediate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 2xx response with a body.
    Fetched,
    /// Transport failure, timeout or non-2xx status.
    Failed,
}

/// The origin resource as this rewrite pass saw it.
///
/// Created on the first reference to a URL and immutable afterwards; every
/// later reference within the pass shares this descriptor. A failed fetch
/// is recorded here, not propagated; filters check
/// [`is_fetched`](Self::is_fetched) and decline the rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputResource {
    /// Absolute origin URL this descriptor was fetched from.
    pub url: String,
    pub status: FetchStatus,
    /// Response body; present only when the fetch succeeded.
    pub bytes: Option<Vec<u8>>,
    /// Content kind, from the response `Content-Type` or the URL extension.
    pub kind: Option<ContentKind>,
    /// The origin's declared freshness lifetime. Zero means the origin is
    /// uncacheable, either explicitly or by saying nothing at all.
    pub cache_ttl: Duration,
}

impl InputResource {
    pub fn is_fetched(&self) -> bool {
        self.status == FetchStatus::Fetched
    }

    pub(crate) fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FetchStatus::Failed,
            bytes: None,
            kind: None,
            cache_ttl: Duration::ZERO,
        }
    }
}

/// A rewritten artifact, materialized into the content store.
///
/// `bytes` is a pure function of the input's fetched bytes and the owning
/// filter's transform, so concurrent rewrites of identical input converge
/// on an identical artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputResource {
    pub name: ResourceName,
    pub bytes: Vec<u8>,
    /// Full synthetic URL references are rewritten to.
    pub url: String,
}

impl OutputResource {
    pub fn content_type(&self) -> &'static str {
        self.name.kind().mime()
    }
}

/// A stored artifact ready to be sent to a client, with the long-lived
/// cache directive that makes the whole exercise worthwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedResource {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub cache_control: String,
}
