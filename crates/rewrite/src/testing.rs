//! Document round-trip helpers for exercising filters against real markup.
//!
//! The production tokenizer is an external collaborator; this module is a
//! deliberately small stand-in that covers the markup shapes the filters
//! care about (tags, quoted and bare attributes, comment directives) so
//! tests can feed documents as strings and compare rewritten output
//! byte-for-byte. It does not handle `<` inside script bodies or other
//! full-HTML corner cases.
//!
//! Do NOT apply `#[cfg(test)]` to this module: downstream crates drive
//! their own filter tests through it.

use crate::events::{Attribute, DocumentEvent, Element, render};
use crate::filter::{DocumentFilter, drive};

/// Split a document into the event sequence a tokenizer would emit,
/// without the terminal [`DocumentEvent::StreamEnd`].
pub fn tokenize(html: &str) -> Vec<DocumentEvent> {
    let bytes = html.as_bytes();
    let mut events = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let end = html[i..].find('<').map_or(html.len(), |at| i + at);
            events.push(DocumentEvent::Text(html[i..end].to_string()));
            i = end;
        } else if html[i..].starts_with("<!--") {
            // Comments carry conditional directives; kept whole and verbatim,
            // embedded tags included.
            let end = html[i..]
                .find("-->")
                .map(|at| i + at + 3)
                .unwrap_or_else(|| panic!("unterminated comment in test document: {html}"));
            events.push(DocumentEvent::SpecialDirective(html[i..end].to_string()));
            i = end;
        } else if html[i..].starts_with("</") {
            let end = html[i..]
                .find('>')
                .map(|at| i + at)
                .unwrap_or_else(|| panic!("unterminated close tag in test document: {html}"));
            events.push(DocumentEvent::ElementClose(html[i + 2..end].trim().to_string()));
            i = end + 1;
        } else {
            let (element, next) = parse_open_tag(html, i);
            events.push(DocumentEvent::ElementOpen(element));
            i = next;
        }
    }
    events
}

/// Tokenize, run one filter over the whole document (terminal `StreamEnd`
/// included), and render the result back to markup.
pub async fn rewrite_document<F>(filter: &mut F, html: &str) -> String
where
    F: DocumentFilter + ?Sized,
{
    let mut events = tokenize(html);
    events.push(DocumentEvent::StreamEnd);
    // A filter error in a test document is a test failure, not a scenario.
    let out = drive(filter, events).await.unwrap_or_else(|err| panic!("filter failed: {err}"));
    render(&out)
}

fn parse_open_tag(html: &str, start: usize) -> (Element, usize) {
    let bytes = html.as_bytes();
    let mut i = start + 1;
    let name_start = i;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'>' | b'/') {
        i += 1;
    }
    let mut element = Element::new(&html[name_start..i]);
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => break,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                element.self_closing = true;
                i += 2;
                break;
            }
            _ => {
                let attr_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let name = html[attr_start..i].to_string();
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    let quote = match bytes.get(i) {
                        Some(&q @ (b'\'' | b'"')) => {
                            i += 1;
                            q as char
                        }
                        _ => '\0',
                    };
                    let value_start = i;
                    if quote == '\0' {
                        while i < bytes.len()
                            && !bytes[i].is_ascii_whitespace()
                            && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        element.attrs.push(Attribute {
                            name,
                            value: Some(html[value_start..i].to_string()),
                            quote,
                        });
                    } else {
                        while i < bytes.len() && bytes[i] != quote as u8 {
                            i += 1;
                        }
                        element.attrs.push(Attribute {
                            name,
                            value: Some(html[value_start..i].to_string()),
                            quote,
                        });
                        i += 1;
                    }
                } else {
                    element.attrs.push(Attribute { name, value: None, quote: '\0' });
                }
            }
        }
    }
    (element, i)
}
