//! In-memory content store.

use crate::ContentStore;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<UtcDateTime>,
}

impl Entry {
    fn is_expired(&self, now: UtcDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`ContentStore`] with lazy TTL expiry.
///
/// Entries are held in a `HashMap` behind a [`RwLock`], so all trait methods
/// operate on `&self` without external synchronisation. Expiry is evaluated
/// on read rather than by a background sweeper: an expired entry stays in
/// the map until the next write to its key, but behaves as a miss from the
/// moment its deadline passes.
///
/// This is the default store for single-process deployments and the store
/// every test uses.
///
/// # Examples
///
/// ```
/// use presto_store::{ContentStore, MemoryStore};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::default();
/// store.put("ce.0.a,s", b".blue { color: blue; }", Some(Duration::from_secs(3600))).await?;
/// assert!(store.exists("ce.0.a,s").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| UtcDateTime::now() + ttl);
        let entry = Entry { bytes: bytes.to_vec(), expires_at };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(entry) if !entry.is_expired(UtcDateTime::now()) => Ok(entry.bytes.clone()),
            Some(_) => {
                debug!(key, "entry expired, reporting miss");
                Err(exn::Exn::from(ErrorKind::NotFound(key.to_string())))
            }
            None => Err(exn::Exn::from(ErrorKind::NotFound(key.to_string()))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let guard = self.entries.read().await;
        Ok(guard.get(key).is_some_and(|entry| !entry.is_expired(UtcDateTime::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put("key", b"bytes", None).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), b"bytes");
        assert!(store.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryStore::new();
        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immediately_expired() {
        let store = MemoryStore::new();
        store.put("key", b"bytes", Some(Duration::ZERO)).await.unwrap();
        let err = store.get("key").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!store.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_long_ttl_entry_is_live() {
        let store = MemoryStore::new();
        store.put("key", b"bytes", Some(Duration::from_secs(31536000))).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_bytes_and_ttl() {
        let store = MemoryStore::new();
        store.put("key", b"old", Some(Duration::ZERO)).await.unwrap();
        store.put("key", b"new", None).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), b"new");
    }
}
