//! Content store trait and implementations.
//!
//! This crate defines the [`ContentStore`] trait: a byte cache keyed by
//! string, with optional TTL metadata per entry. Rewritten artifacts live
//! here under their encoded resource names; the store neither knows nor
//! cares what the keys mean.

pub mod error;
mod memory;

pub use crate::memory::MemoryStore;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub type StoreHandle = Arc<dyn ContentStore>;

/// Shared byte cache with per-entry TTLs.
///
/// All operations are asynchronous so network-backed implementations can
/// slot in without changing callers. Writes are keyed deterministically by
/// the caller, so concurrent writers racing on the same key are expected to
/// be writing identical bytes; last write wins and no additional locking is
/// required beyond what the implementation needs internally.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `key`.
    ///
    /// A `ttl` of `None` means the entry never expires on its own. A `ttl`
    /// of zero produces an entry that is already expired, which is
    /// occasionally useful in tests and harmless everywhere else.
    async fn put(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Fetch the bytes stored under `key`.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) for both
    /// missing and expired entries.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Check whether a live (unexpired) entry exists for `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}
