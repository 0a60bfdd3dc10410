//! Document filters and their dispatch.
//!
//! Each filter is a single-threaded state machine driven by the ordered
//! event sequence of exactly one document. The [`DocumentFilter`] trait is
//! the capability interface the pipeline talks through; [`Filter`] is the
//! closed set of concrete kinds, dispatched by plain `match` rather than an
//! inheritance chain.

pub mod cache_extender;
pub mod script;

use crate::error::Result;
use crate::events::DocumentEvent;
pub use cache_extender::CacheExtender;
use async_trait::async_trait;
use presto_naming::{ContentKind, ResourceName};
pub use script::ScriptRewriteFilter;

/// Event-driven document rewriting capability.
///
/// The pipeline feeds events in document order; the filter pushes zero or
/// more output events per input event (a filter that holds events back is
/// buffering, and must release them on a later event or at `StreamEnd`).
/// All per-reference failures are absorbed inside the filter; an `Err`
/// from `on_event` means infrastructure trouble, not a bad document.
#[async_trait]
pub trait DocumentFilter: Send {
    /// The two-character id this filter stamps into resource names.
    fn id(&self) -> &'static str;

    async fn on_event(
        &mut self,
        event: DocumentEvent,
        out: &mut Vec<DocumentEvent>,
    ) -> Result<()>;

    /// Take (and clear) the degraded-document flag: `true` when the filter
    /// stopped processing at least one script and downstream whole-page
    /// analyses can no longer assume they saw all of the Javascript.
    fn take_some_missing_scripts(&mut self) -> bool {
        false
    }
}

/// The closed set of filters this engine ships.
pub enum Filter {
    CacheExtend(CacheExtender),
    ScriptRewrite(ScriptRewriteFilter),
}

#[async_trait]
impl DocumentFilter for Filter {
    fn id(&self) -> &'static str {
        match self {
            Self::CacheExtend(filter) => filter.id(),
            Self::ScriptRewrite(filter) => filter.id(),
        }
    }

    async fn on_event(
        &mut self,
        event: DocumentEvent,
        out: &mut Vec<DocumentEvent>,
    ) -> Result<()> {
        match self {
            Self::CacheExtend(filter) => filter.on_event(event, out).await,
            Self::ScriptRewrite(filter) => filter.on_event(event, out).await,
        }
    }

    fn take_some_missing_scripts(&mut self) -> bool {
        match self {
            Self::CacheExtend(filter) => filter.take_some_missing_scripts(),
            Self::ScriptRewrite(filter) => filter.take_some_missing_scripts(),
        }
    }
}

/// Pump one document's events through a filter, collecting its output.
///
/// This is the sequential per-document loop the external pipeline runs;
/// exposed so tests and embedders can drive a filter without the pipeline.
pub async fn drive<F>(
    filter: &mut F,
    events: impl IntoIterator<Item = DocumentEvent>,
) -> Result<Vec<DocumentEvent>>
where
    F: DocumentFilter + ?Sized,
{
    let mut out = Vec::new();
    for event in events {
        filter.on_event(event, &mut out).await?;
    }
    Ok(out)
}

/// The final path segment of a reference, query and fragment stripped.
pub(crate) fn final_segment(reference: &str) -> &str {
    let reference = reference.split(['?', '#']).next().unwrap_or(reference);
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Whether a reference already points at a synthetic URL.
///
/// Decoding is the recognition test: a name this system encoded always
/// decodes, and plain origin names never do. This is what makes re-running
/// a filter over its own output a no-op.
pub(crate) fn is_rewritten_reference(reference: &str) -> bool {
    ResourceName::from_url_segment(final_segment(reference)).is_ok()
}

/// Content kind a reference would have, judged by its extension.
pub(crate) fn reference_kind(reference: &str) -> Option<ContentKind> {
    let (_, extension) = final_segment(reference).rsplit_once('.')?;
    ContentKind::from_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::StubHasher;
    use crate::manager::ResourceManager;
    use crate::transform::IdentityTransform;
    use presto_config::RewriteConfig;
    use presto_fetch::MockFetcher;
    use presto_store::MemoryStore;
    use std::sync::Arc;
    use url::Url;

    #[tokio::test]
    async fn filter_variants_dispatch() {
        let config =
            RewriteConfig { base_url: "http://test.com".to_string(), ..RewriteConfig::default() };
        let manager = ResourceManager::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MockFetcher::default()),
            Arc::new(StubHasher),
        );
        let base = Url::parse("http://test.com/").unwrap();

        let mut filter = Filter::CacheExtend(CacheExtender::new(manager.clone(), base.clone()));
        assert_eq!(filter.id(), "ce");
        let out = drive(&mut filter, [DocumentEvent::StreamEnd]).await.unwrap();
        assert_eq!(out, vec![DocumentEvent::StreamEnd]);

        let mut filter = Filter::ScriptRewrite(ScriptRewriteFilter::new(
            manager,
            base,
            Arc::new(IdentityTransform),
        ));
        assert_eq!(filter.id(), "jm");
        assert!(!filter.take_some_missing_scripts());
    }

    #[test]
    fn recognizes_rewritten_references() {
        assert!(is_rewritten_reference("http://test.com/ce.0.a,s.css"));
        assert!(is_rewritten_reference("jm.0.c,l.js"));
        assert!(!is_rewritten_reference("a.css"));
        assert!(!is_rewritten_reference("http://test.com/styles/site.min.css"));
    }

    #[test]
    fn judges_reference_kinds() {
        assert_eq!(reference_kind("a.css"), Some(ContentKind::Css));
        assert_eq!(reference_kind("img/b.jpg?v=1"), Some(ContentKind::Jpeg));
        assert_eq!(reference_kind("page.html"), None);
        assert_eq!(reference_kind("no-extension"), None);
    }
}
