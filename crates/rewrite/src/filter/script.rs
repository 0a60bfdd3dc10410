//! Script rewriting: minify inline scripts, rewrite external ones.

use crate::error::Result;
use crate::events::{DocumentEvent, Element};
use crate::filter::{DocumentFilter, is_rewritten_reference};
use crate::manager::ResourceManager;
use crate::transform::ContentTransform;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Filter id stamped into rewritten script resource names.
pub const SCRIPT_REWRITE_FILTER_ID: &str = "jm";

/// Buffering state between a script-open event and its completion.
///
/// Mutually exclusive with "no script in progress": the buffer is created
/// on script-open and consumed whole on completion, whether that happens
/// at the matching close tag, a forced flush, or the end of the stream.
enum ScriptState {
    Idle,
    /// `<script>` with no `src`: body text accumulates here until the
    /// script completes, then goes through the minifier in one piece.
    Inline { element: Element, buffer: String },
    /// `<script src=...>`: the body carries no script to minify, only the
    /// reference is rewritten. Stray body text is kept to re-emit verbatim.
    External { element: Element, buffer: String },
}

/// Finds scripts (inline bodies and external references) and rewrites
/// them through the injected minification transform.
///
/// The filter buffers text fragments across parse events, so a script
/// split over many `Text` callbacks is minified as one unit. Any failure
/// leaves the original content in place and raises the
/// `some_missing_scripts` flag: downstream whole-page analyses are flagged
/// as degraded, never blocked.
pub struct ScriptRewriteFilter {
    manager: Arc<ResourceManager>,
    document_base: Url,
    minifier: Arc<dyn ContentTransform>,
    state: ScriptState,
    some_missing_scripts: bool,
}

impl ScriptRewriteFilter {
    /// `minifier` is the injected pure bytes-to-bytes minification
    /// transform; this filter never inspects script semantics itself.
    pub fn new(
        manager: Arc<ResourceManager>,
        document_base: Url,
        minifier: Arc<dyn ContentTransform>,
    ) -> Self {
        manager.register_filter(SCRIPT_REWRITE_FILTER_ID, minifier.clone());
        Self {
            manager,
            document_base,
            minifier,
            state: ScriptState::Idle,
            some_missing_scripts: false,
        }
    }

    fn script_open(&self) -> bool {
        !matches!(self.state, ScriptState::Idle)
    }

    /// Complete the script in progress and emit it.
    ///
    /// `emit_close` is true only for a clean `</script>`; forced
    /// completions (flush, stream end, unexpected next element) leave the
    /// close tag to arrive (or not) on its own.
    async fn complete(&mut self, emit_close: bool, out: &mut Vec<DocumentEvent>) {
        match std::mem::replace(&mut self.state, ScriptState::Idle) {
            ScriptState::Idle => {}
            ScriptState::Inline { element, buffer } => {
                let text = self.minify_inline(&buffer);
                out.push(DocumentEvent::ElementOpen(element));
                if !text.is_empty() {
                    out.push(DocumentEvent::Text(text));
                }
                if emit_close {
                    out.push(DocumentEvent::ElementClose("script".to_string()));
                }
            }
            ScriptState::External { mut element, buffer } => {
                self.rewrite_external(&mut element).await;
                out.push(DocumentEvent::ElementOpen(element));
                if !buffer.is_empty() {
                    out.push(DocumentEvent::Text(buffer));
                }
                if emit_close {
                    out.push(DocumentEvent::ElementClose("script".to_string()));
                }
            }
        }
    }

    /// Minify the buffered body, falling back to the original text when
    /// the minifier rejects it (malformed script).
    fn minify_inline(&mut self, buffer: &str) -> String {
        match self.minifier.apply(buffer.as_bytes()).map(String::from_utf8) {
            Ok(Ok(minified)) => minified,
            Ok(Err(err)) => {
                warn!(error = %err, "minifier produced non-utf8 output, keeping original script");
                self.some_missing_scripts = true;
                buffer.to_string()
            }
            Err(err) => {
                debug!(error = %err, "inline script minification failed, keeping original");
                self.some_missing_scripts = true;
                buffer.to_string()
            }
        }
    }

    async fn rewrite_external(&mut self, element: &mut Element) {
        let Some(src) = element.attr("src").map(str::to_string) else {
            return;
        };
        if is_rewritten_reference(&src) {
            return;
        }
        let resolved = match self.document_base.join(&src) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(src, error = %err, "script src does not resolve, leaving as-is");
                self.some_missing_scripts = true;
                return;
            }
        };
        let input = self.manager.get_input_resource(resolved.as_str()).await;
        if !input.is_fetched() {
            self.some_missing_scripts = true;
            return;
        }
        match self
            .manager
            .create_output_resource(&input, SCRIPT_REWRITE_FILTER_ID, &*self.minifier)
            .await
        {
            Ok(output) => element.set_attr("src", output.url),
            Err(err) => {
                warn!(url = %input.url, error = %err, "external script rewrite failed");
                self.some_missing_scripts = true;
            }
        }
    }
}

#[async_trait]
impl DocumentFilter for ScriptRewriteFilter {
    fn id(&self) -> &'static str {
        SCRIPT_REWRITE_FILTER_ID
    }

    async fn on_event(
        &mut self,
        event: DocumentEvent,
        out: &mut Vec<DocumentEvent>,
    ) -> Result<()> {
        match event {
            DocumentEvent::ElementOpen(element) if element.is("script") => {
                if self.script_open() {
                    // Malformed or partially-streamed document: finish the
                    // previous script before opening the new one.
                    self.complete(false, out).await;
                }
                if element.self_closing {
                    // A void script carries nothing to rewrite.
                    out.push(DocumentEvent::ElementOpen(element));
                } else if element.attr("src").is_some() {
                    self.state = ScriptState::External { element, buffer: String::new() };
                } else {
                    self.state = ScriptState::Inline { element, buffer: String::new() };
                }
            }
            DocumentEvent::ElementOpen(element) => {
                if self.script_open() {
                    self.complete(false, out).await;
                }
                out.push(DocumentEvent::ElementOpen(element));
            }
            DocumentEvent::Text(text) => match &mut self.state {
                ScriptState::Idle => out.push(DocumentEvent::Text(text)),
                ScriptState::Inline { buffer, .. } | ScriptState::External { buffer, .. } => {
                    buffer.push_str(&text);
                }
            },
            DocumentEvent::ElementClose(tag) if tag.eq_ignore_ascii_case("script") => {
                if self.script_open() {
                    self.complete(true, out).await;
                } else {
                    // Stray close; not ours to fix.
                    out.push(DocumentEvent::ElementClose(tag));
                }
            }
            DocumentEvent::ElementClose(tag) => {
                if self.script_open() {
                    self.complete(false, out).await;
                }
                out.push(DocumentEvent::ElementClose(tag));
            }
            DocumentEvent::Flush => {
                // The host may emit output before the document is fully
                // parsed. Conservatively treat buffered content as final.
                if self.script_open() {
                    self.complete(false, out).await;
                }
                out.push(DocumentEvent::Flush);
            }
            DocumentEvent::SpecialDirective(directive) => {
                // Directives pass through and do not affect buffering state.
                out.push(DocumentEvent::SpecialDirective(directive));
            }
            DocumentEvent::StreamEnd => {
                if self.script_open() {
                    // Document ended without a clean close; whatever we
                    // buffered is all there is.
                    self.complete(false, out).await;
                    self.some_missing_scripts = true;
                }
                out.push(DocumentEvent::StreamEnd);
            }
        }
        Ok(())
    }

    fn take_some_missing_scripts(&mut self) -> bool {
        std::mem::take(&mut self.some_missing_scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hasher::StubHasher;
    use crate::testing::rewrite_document;
    use presto_config::RewriteConfig;
    use presto_fetch::MockFetcher;
    use presto_store::MemoryStore;
    use std::sync::Mutex;

    const DOMAIN: &str = "http://test.com";

    /// Collapses whitespace runs to single spaces and trims, which is
    /// enough of a "minifier" to observe transformation without a real
    /// JS parser.
    struct CollapseWhitespace {
        seen: Mutex<Vec<String>>,
    }

    impl CollapseWhitespace {
        fn new() -> Arc<Self> {
            Arc::new(Self { seen: Mutex::new(Vec::new()) })
        }

        fn inputs(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ContentTransform for CollapseWhitespace {
        fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>> {
            let text = String::from_utf8_lossy(bytes).to_string();
            self.seen.lock().unwrap().push(text.clone());
            Ok(text.split_whitespace().collect::<Vec<_>>().join(" ").into_bytes())
        }
    }

    struct RejectEverything;

    impl ContentTransform for RejectEverything {
        fn apply(&self, _bytes: &[u8]) -> Result<Vec<u8>> {
            Err(exn::Exn::from(ErrorKind::TransformFailed("stub minifier".to_string())))
        }
    }

    fn filter_over(
        fetcher: MockFetcher,
        minifier: Arc<dyn ContentTransform>,
    ) -> (ScriptRewriteFilter, Arc<ResourceManager>) {
        let config =
            RewriteConfig { base_url: DOMAIN.to_string(), ..RewriteConfig::default() };
        let manager = ResourceManager::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(fetcher),
            Arc::new(StubHasher),
        );
        let base = Url::parse(&format!("{DOMAIN}/")).unwrap();
        (ScriptRewriteFilter::new(manager.clone(), base, minifier), manager)
    }

    #[tokio::test]
    async fn inline_script_is_minified() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let html = "<p>hi</p><script>  var x  =  1;  </script><p>bye</p>";
        let rewritten = rewrite_document(&mut filter, html).await;
        assert_eq!(rewritten, "<p>hi</p><script>var x = 1;</script><p>bye</p>");
        assert!(!filter.take_some_missing_scripts());
    }

    #[tokio::test]
    async fn fragments_are_concatenated_before_minification() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier.clone());
        let events = vec![
            DocumentEvent::ElementOpen(Element::new("script")),
            DocumentEvent::Text("A".to_string()),
            DocumentEvent::Text("B".to_string()),
            DocumentEvent::ElementClose("script".to_string()),
            DocumentEvent::StreamEnd,
        ];
        crate::filter::drive(&mut filter, events).await.unwrap();
        // The minifier saw one combined body, not two fragments.
        assert_eq!(minifier.inputs(), vec!["AB".to_string()]);
    }

    #[tokio::test]
    async fn failed_minification_keeps_original_and_flags() {
        let (mut filter, _manager) =
            filter_over(MockFetcher::default(), Arc::new(RejectEverything));
        let html = "<script>var broken = </script>";
        let rewritten = rewrite_document(&mut filter, html).await;
        assert_eq!(rewritten, html);
        assert!(filter.take_some_missing_scripts());
        // The flag is take-and-clear; a second read reports a clean slate.
        assert!(!filter.take_some_missing_scripts());
    }

    #[tokio::test]
    async fn external_script_is_rewritten_and_served_minified() {
        let minifier = CollapseWhitespace::new();
        let fetcher = MockFetcher::default().with_resource(
            format!("{DOMAIN}/c.js"),
            b"alert( 'hello,   world!' )",
            "text/javascript",
            100,
        );
        let (mut filter, manager) = filter_over(fetcher, minifier);
        let html = "<script src='c.js'></script>";
        let rewritten = rewrite_document(&mut filter, html).await;
        assert_eq!(rewritten, format!("<script src='{DOMAIN}/jm.0.c,l.js'></script>"));
        assert!(!filter.take_some_missing_scripts());

        let served = manager.serve(&format!("{DOMAIN}/jm.0.c,l.js")).await.unwrap();
        assert_eq!(served.bytes, b"alert( 'hello, world!' )");
        assert_eq!(served.content_type, "text/javascript");
    }

    #[tokio::test]
    async fn external_fetch_failure_leaves_src_and_flags() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let html = "<script src='missing.js'></script>";
        assert_eq!(rewrite_document(&mut filter, html).await, html);
        assert!(filter.take_some_missing_scripts());
    }

    #[tokio::test]
    async fn already_rewritten_src_is_skipped() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let html = format!("<script src='{DOMAIN}/jm.0.c,l.js'></script>");
        assert_eq!(rewrite_document(&mut filter, &html).await, html);
        // Skipping its own output is not a missing script.
        assert!(!filter.take_some_missing_scripts());
    }

    #[tokio::test]
    async fn flush_forces_completion_of_buffered_script() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let events = vec![
            DocumentEvent::ElementOpen(Element::new("script")),
            DocumentEvent::Text("var a  =  1;".to_string()),
            DocumentEvent::Flush,
            DocumentEvent::Text(" var b = 2;".to_string()),
            DocumentEvent::ElementClose("script".to_string()),
            DocumentEvent::StreamEnd,
        ];
        let out = crate::filter::drive(&mut filter, events).await.unwrap();
        // Content before the flush was treated as final and minified; the
        // remainder passed through untouched, and the real close tag
        // arrived on its own.
        assert_eq!(
            crate::events::render(&out),
            "<script>var a = 1; var b = 2;</script>"
        );
    }

    #[tokio::test]
    async fn stream_end_mid_script_completes_and_flags() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let events = vec![
            DocumentEvent::ElementOpen(Element::new("script")),
            DocumentEvent::Text("var x =  1;".to_string()),
            DocumentEvent::StreamEnd,
        ];
        let out = crate::filter::drive(&mut filter, events).await.unwrap();
        assert_eq!(crate::events::render(&out), "<script>var x = 1;");
        assert!(filter.take_some_missing_scripts());
    }

    #[tokio::test]
    async fn second_open_forces_completion_of_first() {
        let minifier = CollapseWhitespace::new();
        let fetcher = MockFetcher::default().with_resource(
            format!("{DOMAIN}/c.js"),
            b"x",
            "text/javascript",
            100,
        );
        let (mut filter, _manager) = filter_over(fetcher, minifier);
        let mut external = Element::new("script");
        external.set_attr("src", "c.js");
        let events = vec![
            DocumentEvent::ElementOpen(Element::new("script")),
            DocumentEvent::Text("first()".to_string()),
            DocumentEvent::ElementOpen(external),
            DocumentEvent::ElementClose("script".to_string()),
            DocumentEvent::StreamEnd,
        ];
        let out = crate::filter::drive(&mut filter, events).await.unwrap();
        let html = crate::events::render(&out);
        assert!(html.starts_with("<script>first()"));
        assert!(html.contains("jm.0.c,l.js"));
    }

    #[tokio::test]
    async fn directives_pass_through_untouched() {
        let minifier = CollapseWhitespace::new();
        let (mut filter, _manager) = filter_over(MockFetcher::default(), minifier);
        let html = "<!--[if IE]><p>old</p><![endif]--><script>a  =  1</script>";
        let rewritten = rewrite_document(&mut filter, html).await;
        assert_eq!(rewritten, "<!--[if IE]><p>old</p><![endif]--><script>a = 1</script>");
    }
}
