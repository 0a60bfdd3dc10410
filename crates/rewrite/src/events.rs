//! Document parse events and their textual rendering.
//!
//! The HTML tokenizer itself is an external collaborator; filters only see
//! the ordered event sequence it emits for one document. Elements carry
//! their attributes in source order, with quoting preserved, so a document
//! that nothing rewrites renders back byte-identical.

/// A single attribute, as written in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// `None` for bare boolean attributes (`<script async>`).
    pub value: Option<String>,
    /// The quote character used in the source; `'\0'` for unquoted values.
    pub quote: char,
}

impl Attribute {
    fn render(&self, out: &mut String) {
        out.push(' ');
        out.push_str(&self.name);
        let Some(value) = &self.value else {
            return;
        };
        out.push('=');
        if self.quote == '\0' {
            out.push_str(value);
        } else {
            out.push(self.quote);
            out.push_str(value);
            out.push(self.quote);
        }
    }
}

/// An opened element: tag name plus ordered attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    /// Whether the source tag was spelled `<tag ... />`.
    pub self_closing: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), attrs: Vec::new(), self_closing: false }
    }

    /// Case-insensitive tag name comparison.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// The value of the first attribute with the given (case-insensitive) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
            .and_then(|attr| attr.value.as_deref())
    }

    /// Replace an attribute's value in place, preserving its position and
    /// quoting; appends a new double-quoted attribute if absent.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|attr| attr.name.eq_ignore_ascii_case(name)) {
            Some(attr) => attr.value = Some(value),
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value: Some(value),
                quote: '"',
            }),
        }
    }
}

/// One document-parse callback, in document order.
///
/// The pipeline contract: `Flush` occurs zero or more times at arbitrary
/// safe boundaries, `StreamEnd` exactly once terminally, everything else as
/// the document dictates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    ElementOpen(Element),
    Text(String),
    ElementClose(String),
    Flush,
    /// Conditional-comment style directives (`<!--[if IE]>...`); carried
    /// verbatim and never interpreted.
    SpecialDirective(String),
    StreamEnd,
}

/// Render an event sequence back into document text.
///
/// `Flush` and `StreamEnd` are control markers and render to nothing.
pub fn render(events: &[DocumentEvent]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            DocumentEvent::ElementOpen(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for attr in &element.attrs {
                    attr.render(&mut out);
                }
                out.push_str(if element.self_closing { "/>" } else { ">" });
            }
            DocumentEvent::Text(text) => out.push_str(text),
            DocumentEvent::ElementClose(tag) => {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            DocumentEvent::SpecialDirective(directive) => out.push_str(directive),
            DocumentEvent::Flush | DocumentEvent::StreamEnd => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_elements_with_preserved_quoting() {
        let mut element = Element::new("link");
        element.attrs.push(Attribute {
            name: "href".to_string(),
            value: Some("a.css".to_string()),
            quote: '\'',
        });
        let html = render(&[DocumentEvent::ElementOpen(element)]);
        assert_eq!(html, "<link href='a.css'>");
    }

    #[test]
    fn renders_bare_and_self_closing() {
        let mut element = Element::new("img");
        element.attrs.push(Attribute { name: "async".to_string(), value: None, quote: '\0' });
        element.self_closing = true;
        let html = render(&[
            DocumentEvent::ElementOpen(element),
            DocumentEvent::Flush,
            DocumentEvent::Text("x".to_string()),
            DocumentEvent::ElementClose("p".to_string()),
            DocumentEvent::StreamEnd,
        ]);
        assert_eq!(html, "<img async/>x</p>");
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut element = Element::new("script");
        element.attrs.push(Attribute {
            name: "src".to_string(),
            value: Some("c.js".to_string()),
            quote: '\'',
        });
        element.set_attr("src", "http://d/jm.0.c,l.js");
        assert_eq!(element.attr("src"), Some("http://d/jm.0.c,l.js"));
        // Quote style survives the replacement.
        assert_eq!(element.attrs[0].quote, '\'');
    }
}
