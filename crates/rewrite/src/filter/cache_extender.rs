//! Cache extension: rewriting short-lived references to fingerprinted URLs.

use crate::error::Result;
use crate::events::{DocumentEvent, Element};
use crate::filter::{DocumentFilter, is_rewritten_reference, reference_kind};
use crate::manager::ResourceManager;
use crate::resource::InputResource;
use crate::transform::{ContentTransform, IdentityTransform};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Filter id stamped into cache-extended resource names.
pub const CACHE_EXTEND_FILTER_ID: &str = "ce";

/// Why a reference was or wasn't extended. Computed per reference from the
/// origin's declared TTL and the configured threshold; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Origin TTL is positive but below the threshold: rewrite.
    Extend,
    /// Origin already serves itself with a long enough lifetime.
    AlreadyCachedProperly,
    /// Origin declared itself uncacheable; extending would violate its
    /// intent, short TTL or not.
    OriginUncacheable,
    /// We never got the bytes, so there is nothing to re-serve.
    FetchFailed,
}

impl CacheDecision {
    pub fn should_extend(self) -> bool {
        self == Self::Extend
    }

    pub fn decide(input: &InputResource, threshold: Duration) -> Self {
        if !input.is_fetched() {
            return Self::FetchFailed;
        }
        if input.cache_ttl.is_zero() {
            return Self::OriginUncacheable;
        }
        if input.cache_ttl >= threshold {
            return Self::AlreadyCachedProperly;
        }
        Self::Extend
    }
}

/// Rewrites stylesheet, image and script references whose origin cache
/// lifetime is too short, swapping the URL for a fingerprinted one the
/// serving surface answers with a maximal lifetime.
///
/// State machine per reference: Idle → Deciding → Rewriting or PassThrough
/// → Idle. The bytes are untouched (identity transform); only the URL
/// identity changes. Every failure path passes the reference through
/// unmodified; a page with a broken stylesheet origin still renders, it
/// just doesn't cache any better than before.
pub struct CacheExtender {
    manager: Arc<ResourceManager>,
    document_base: Url,
    transform: Arc<dyn ContentTransform>,
}

impl CacheExtender {
    /// `document_base` is the URL of the page being rewritten; relative
    /// references resolve against it.
    pub fn new(manager: Arc<ResourceManager>, document_base: Url) -> Self {
        let transform: Arc<dyn ContentTransform> = Arc::new(IdentityTransform);
        manager.register_filter(CACHE_EXTEND_FILTER_ID, transform.clone());
        Self { manager, document_base, transform }
    }

    /// The attribute carrying a rewritable reference for this element.
    fn reference_attr(element: &Element) -> Option<&'static str> {
        if element.is("link") {
            Some("href")
        } else if element.is("img") || element.is("script") {
            Some("src")
        } else {
            None
        }
    }

    async fn maybe_extend(&self, element: &mut Element) {
        let Some(attr) = Self::reference_attr(element) else {
            return;
        };
        let Some(reference) = element.attr(attr) else {
            return;
        };
        if is_rewritten_reference(reference) || reference_kind(reference).is_none() {
            return;
        }
        let resolved = match self.document_base.join(reference) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(reference, error = %err, "reference does not resolve, leaving as-is");
                return;
            }
        };

        let input = self.manager.get_input_resource(resolved.as_str()).await;
        let decision = CacheDecision::decide(&input, self.manager.config().min_cache_ttl());
        debug!(url = %input.url, ?decision, "cache decision");
        if !decision.should_extend() {
            return;
        }
        match self.manager.create_output_resource(&input, CACHE_EXTEND_FILTER_ID, &*self.transform).await
        {
            Ok(output) => element.set_attr(attr, output.url),
            // Per-reference degradation, never a document-level failure.
            Err(err) => warn!(url = %input.url, error = %err, "cache extension failed"),
        }
    }
}

#[async_trait]
impl DocumentFilter for CacheExtender {
    fn id(&self) -> &'static str {
        CACHE_EXTEND_FILTER_ID
    }

    async fn on_event(
        &mut self,
        event: DocumentEvent,
        out: &mut Vec<DocumentEvent>,
    ) -> Result<()> {
        match event {
            DocumentEvent::ElementOpen(mut element) => {
                self.maybe_extend(&mut element).await;
                out.push(DocumentEvent::ElementOpen(element));
            }
            other => out.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::StubHasher;
    use crate::resource::FetchStatus;
    use crate::testing::rewrite_document;
    use presto_config::RewriteConfig;
    use presto_fetch::MockFetcher;
    use presto_store::MemoryStore;
    use rstest::rstest;

    const DOMAIN: &str = "http://test.com";
    const CSS_DATA: &[u8] = b".blue {color: blue;}";
    const IMAGE_DATA: &[u8] = b"Invalid JPEG but it does not matter for this test";
    const JS_DATA: &[u8] = b"alert('hello, world!')";

    fn generate_html(a: &str, b: &str, c: &str) -> String {
        format!(
            "<link rel='stylesheet' href='{a}.css' type='text/css'>\n\
             <img src='{b}.jpg'/>\n\
             <script type='text/javascript' src='{c}.js'></script>\n"
        )
    }

    fn fetcher_with_ttl(ttl: u64) -> MockFetcher {
        MockFetcher::default()
            .with_resource(format!("{DOMAIN}/a.css"), CSS_DATA, "text/css", ttl)
            .with_resource(format!("{DOMAIN}/b.jpg"), IMAGE_DATA, "image/jpeg", ttl)
            .with_resource(format!("{DOMAIN}/c.js"), JS_DATA, "text/javascript", ttl)
    }

    fn extender_over(fetcher: MockFetcher) -> (CacheExtender, Arc<ResourceManager>) {
        let config =
            RewriteConfig { base_url: DOMAIN.to_string(), ..RewriteConfig::default() };
        let manager = ResourceManager::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(fetcher),
            Arc::new(StubHasher),
        );
        let base = Url::parse(&format!("{DOMAIN}/")).unwrap();
        (CacheExtender::new(manager.clone(), base), manager)
    }

    #[rstest]
    // Short origin TTL: positive but far below the one-year threshold.
    #[case(100, Duration::from_secs(31536000), CacheDecision::Extend)]
    // Origin already cached properly.
    #[case(100000000, Duration::from_secs(31536000), CacheDecision::AlreadyCachedProperly)]
    // TTL exactly at the threshold counts as properly cached.
    #[case(31536000, Duration::from_secs(31536000), CacheDecision::AlreadyCachedProperly)]
    // Origin uncacheable.
    #[case(0, Duration::from_secs(31536000), CacheDecision::OriginUncacheable)]
    fn cache_decisions(
        #[case] ttl_secs: u64,
        #[case] threshold: Duration,
        #[case] expected: CacheDecision,
    ) {
        let input = InputResource {
            url: format!("{DOMAIN}/a.css"),
            status: FetchStatus::Fetched,
            bytes: Some(CSS_DATA.to_vec()),
            kind: Some(presto_naming::ContentKind::Css),
            cache_ttl: Duration::from_secs(ttl_secs),
        };
        assert_eq!(CacheDecision::decide(&input, threshold), expected);
        assert_eq!(expected.should_extend(), expected == CacheDecision::Extend);
    }

    #[test]
    fn failed_fetch_decision() {
        let input = InputResource::failed(format!("{DOMAIN}/a.css"));
        let decision = CacheDecision::decide(&input, Duration::from_secs(31536000));
        assert_eq!(decision, CacheDecision::FetchFailed);
        assert!(!decision.should_extend());
    }

    #[tokio::test]
    async fn do_extend() {
        let fetcher = Arc::new(fetcher_with_ttl(100));
        let config =
            RewriteConfig { base_url: DOMAIN.to_string(), ..RewriteConfig::default() };
        let manager = ResourceManager::new(
            config,
            Arc::new(MemoryStore::new()),
            fetcher.clone(),
            Arc::new(StubHasher),
        );
        let base = Url::parse(&format!("{DOMAIN}/")).unwrap();
        let mut filter = CacheExtender::new(manager, base);

        let expected = generate_html(
            &format!("{DOMAIN}/ce.0.a,s"),
            &format!("{DOMAIN}/ce.0.b,j"),
            &format!("{DOMAIN}/ce.0.c,l"),
        );
        // Same document three times through the same filter: the result is
        // stable and the inputs are only fetched once each.
        for _ in 0..3 {
            let rewritten = rewrite_document(&mut filter, &generate_html("a", "b", "c")).await;
            assert_eq!(rewritten, expected);
        }
        for url in ["a.css", "b.jpg", "c.js"] {
            assert_eq!(fetcher.fetch_count(&format!("{DOMAIN}/{url}")), 1);
        }
    }

    #[tokio::test]
    async fn rewriting_is_idempotent() {
        let (mut filter, _manager) = extender_over(fetcher_with_ttl(100));
        let first = rewrite_document(&mut filter, &generate_html("a", "b", "c")).await;
        let second = rewrite_document(&mut filter, &first).await;
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn no_extend_already_cached_properly() {
        let (mut filter, _manager) = extender_over(fetcher_with_ttl(100000000));
        let html = generate_html("a", "b", "c");
        assert_eq!(rewrite_document(&mut filter, &html).await, html);
    }

    #[tokio::test]
    async fn no_extend_origin_uncacheable() {
        let (mut filter, _manager) = extender_over(fetcher_with_ttl(0));
        let html = generate_html("a", "b", "c");
        assert_eq!(rewrite_document(&mut filter, &html).await, html);
    }

    #[tokio::test]
    async fn fetch_failure_passes_reference_through() {
        // No canned responses at all: every fetch fails.
        let (mut filter, _manager) = extender_over(MockFetcher::default());
        let html = generate_html("a", "b", "c");
        assert_eq!(rewrite_document(&mut filter, &html).await, html);
    }

    #[tokio::test]
    async fn unknown_extensions_are_not_eligible() {
        let (mut filter, _manager) = extender_over(fetcher_with_ttl(100));
        let html = "<link href='feed.xml'><img src='pixel'>";
        assert_eq!(rewrite_document(&mut filter, html).await, html);
    }

    #[tokio::test]
    async fn serve_files_after_extension() {
        let (mut filter, manager) = extender_over(fetcher_with_ttl(100));
        rewrite_document(&mut filter, &generate_html("a", "b", "c")).await;

        let css = manager.serve(&format!("{DOMAIN}/ce.0.a,s.css")).await.unwrap();
        assert_eq!(css.bytes, CSS_DATA);
        assert_eq!(css.content_type, "text/css");

        let image = manager.serve(&format!("{DOMAIN}/ce.0.b,j.jpg")).await.unwrap();
        assert_eq!(image.bytes, IMAGE_DATA);
        assert_eq!(image.content_type, "image/jpeg");

        let js = manager.serve(&format!("{DOMAIN}/ce.0.c,l.js")).await.unwrap();
        assert_eq!(js.bytes, JS_DATA);
        assert_eq!(js.content_type, "text/javascript");
    }
}
