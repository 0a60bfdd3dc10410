//! Orchestration of fetch, hash, store and serve.

use crate::error::{ErrorKind, Result};
use crate::hasher::ContentHasher;
use crate::resource::{FetchStatus, InputResource, OutputResource, ServedResource};
use crate::transform::ContentTransform;
use exn::OptionExt;
use presto_config::RewriteConfig;
use presto_fetch::FetcherHandle;
use presto_naming::{ContentKind, ResourceName};
use presto_store::StoreHandle;
use presto_store::error::ErrorKind as StoreErrorKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

type InputCell = Arc<OnceCell<Arc<InputResource>>>;

/// Owns every rewritten artifact and the machinery that produces them.
///
/// One manager serves one rewrite pass (or one serving context); multiple
/// documents may share it concurrently. The filters are single-threaded
/// state machines, so all cross-document coordination lives here:
///
/// - **At-most-one-fetch**: concurrent requests for the same origin URL
///   share a single in-flight fetch through a per-URL [`OnceCell`]; late
///   arrivals attach to the pending result instead of fetching again.
///   Unrelated URLs fetch in parallel, nothing serializes them.
/// - **Deterministic artifacts**: output bytes are a pure function of input
///   bytes and transform, so writers racing on the same store key are
///   writing identical content and the race is harmless.
pub struct ResourceManager {
    config: RewriteConfig,
    store: StoreHandle,
    fetcher: FetcherHandle,
    hasher: Arc<dyn ContentHasher>,
    inflight: Mutex<HashMap<String, InputCell>>,
    /// Transform registered by the filter owning each filter id, used to
    /// regenerate artifacts on the serving path.
    transforms: RwLock<HashMap<&'static str, Arc<dyn ContentTransform>>>,
    /// Origin URL each encoded name was materialized from, for the
    /// deterministic regeneration path.
    origins: RwLock<HashMap<String, String>>,
}

impl ResourceManager {
    pub fn new(
        config: RewriteConfig,
        store: StoreHandle,
        fetcher: FetcherHandle,
        hasher: Arc<dyn ContentHasher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            fetcher,
            hasher,
            inflight: Mutex::new(HashMap::new()),
            transforms: RwLock::new(HashMap::new()),
            origins: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Register the transform behind a filter id.
    ///
    /// Each id belongs to exactly one filter kind; re-registering the same
    /// id (another filter instance for another document) is a no-op, in
    /// line with the store's put-if-absent semantics.
    pub fn register_filter(&self, filter_id: &'static str, transform: Arc<dyn ContentTransform>) {
        self.transforms.write().unwrap().entry(filter_id).or_insert(transform);
    }

    /// Fetch an origin resource, or attach to a fetch already in flight.
    ///
    /// Never fails: fetch errors and non-2xx statuses come back as a
    /// descriptor with [`FetchStatus::Failed`], which filters treat as
    /// "leave the reference unrewritten". The descriptor is shared by every
    /// caller asking for the same URL within this manager's lifetime.
    #[instrument(skip(self))]
    pub async fn get_input_resource(&self, url: &str) -> Arc<InputResource> {
        let cell: InputCell = {
            let mut inflight = self.inflight.lock().unwrap();
            inflight.entry(url.to_string()).or_default().clone()
            // Lock dropped here; the fetch itself never runs under it.
        };
        cell.get_or_init(|| async { Arc::new(self.fetch_input(url).await) }).await.clone()
    }

    async fn fetch_input(&self, url: &str) -> InputResource {
        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "origin fetch failed");
                return InputResource::failed(url);
            }
        };
        if !response.is_success() {
            warn!(url, status = response.status, "origin responded with non-success status");
            return InputResource::failed(url);
        }
        let kind = response
            .content_type
            .as_deref()
            .and_then(ContentKind::from_mime)
            .or_else(|| extension_of(url).and_then(ContentKind::from_extension));
        InputResource {
            url: url.to_string(),
            status: FetchStatus::Fetched,
            bytes: Some(response.bytes),
            kind,
            // No declaration means we can't trust it to be cacheable at all.
            cache_ttl: response.cache_ttl.unwrap_or_default(),
        }
    }

    /// Materialize a rewritten artifact from a fetched input.
    ///
    /// Applies `transform`, fingerprints the result, stores the bytes under
    /// the encoded name with the long output TTL, and returns the resource
    /// together with its synthetic URL.
    #[instrument(skip(self, input, transform), fields(url = %input.url))]
    pub async fn create_output_resource(
        &self,
        input: &InputResource,
        filter_id: &'static str,
        transform: &dyn ContentTransform,
    ) -> Result<OutputResource> {
        if !input.is_fetched() {
            exn::bail!(ErrorKind::FetchFailed(input.url.clone()));
        }
        let source = input.bytes.as_deref().unwrap_or_default();
        let bytes = transform.apply(source)?;
        let kind = input.kind.ok_or_raise(|| ErrorKind::UnsupportedContent(input.url.clone()))?;
        let hash = self.hasher.hash(&bytes);
        let name = ResourceName::new(filter_id, hash, leaf_of(&input.url), kind)
            .map_err(ErrorKind::naming)?;
        let encoded = name.encode();

        self.store
            .put(&encoded, &bytes, Some(self.config.output_ttl()))
            .await
            .map_err(ErrorKind::store)?;
        self.origins.write().unwrap().insert(encoded, input.url.clone());

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), name.url_segment());
        debug!(%url, "materialized output resource");
        Ok(OutputResource { name, bytes, url })
    }

    /// Serve a stored artifact for a synthetic URL path.
    ///
    /// On a store miss the artifact is regenerated deterministically:
    /// re-fetch the recorded origin, reapply the owning filter's transform,
    /// re-store. Only when that also fails does the caller get
    /// [`ResourceUnavailable`](ErrorKind::ResourceUnavailable), which maps
    /// to a not-found response.
    #[instrument(skip(self))]
    pub async fn serve(&self, path: &str) -> Result<ServedResource> {
        let segment = final_segment(path);
        let name = ResourceName::from_url_segment(segment)
            .map_err(|err| err.raise(ErrorKind::ResourceUnavailable(path.to_string())))?;
        let encoded = name.encode();

        let bytes = match self.store.get(&encoded).await {
            Ok(bytes) => bytes,
            Err(err) if matches!(&*err, StoreErrorKind::NotFound(_)) => {
                debug!(key = %encoded, "store miss, attempting regeneration");
                self.regenerate(&name, &encoded).await?
            }
            Err(err) => return Err(ErrorKind::store(err)),
        };

        Ok(ServedResource {
            bytes,
            content_type: name.kind().mime(),
            cache_control: format!("public, max-age={}", self.config.output_ttl_secs),
        })
    }

    async fn regenerate(&self, name: &ResourceName, encoded: &str) -> Result<Vec<u8>> {
        let unavailable = || ErrorKind::ResourceUnavailable(encoded.to_string());
        let origin = self.origins.read().unwrap().get(encoded).cloned().ok_or_raise(unavailable)?;
        let transform = self
            .transforms
            .read()
            .unwrap()
            .get(name.filter_id())
            .cloned()
            .ok_or_raise(unavailable)?;
        let input = self.get_input_resource(&origin).await;
        if !input.is_fetched() {
            exn::bail!(unavailable());
        }
        let source = input.bytes.as_deref().unwrap_or_default();
        let bytes = transform.apply(source).map_err(|err| err.raise(unavailable()))?;
        // We encoded this name ourselves; the transform is deterministic, so
        // regenerating must reproduce the fingerprint.
        debug_assert_eq!(self.hasher.hash(&bytes), name.hash());
        self.store
            .put(encoded, &bytes, Some(self.config.output_ttl()))
            .await
            .map_err(ErrorKind::store)?;
        Ok(bytes)
    }
}

/// The final path segment, with any query or fragment stripped.
fn final_segment(url: &str) -> &str {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    url.rsplit('/').next().unwrap_or(url)
}

/// The leaf name of an origin URL: the final segment's stem, up to the
/// first dot. `http://o/styles/a.min.css` → `a`.
fn leaf_of(url: &str) -> &str {
    let segment = final_segment(url);
    segment.split_once('.').map_or(segment, |(stem, _)| stem)
}

/// File extension of a URL's final path segment, if any.
fn extension_of(url: &str) -> Option<&str> {
    final_segment(url).rsplit_once('.').map(|(_, ext)| ext)
}
