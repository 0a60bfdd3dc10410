//! Encoding and decoding of synthetic resource names.
//!
//! An encoded name looks like `ce.0123abcd.logo,j` and is embedded as the
//! stem of the final path segment of a rewritten URL, with the canonical
//! file extension appended after it: `ce.0123abcd.logo,j.jpg`. Everything
//! here is pure string transformation; no network or cache access.

use crate::error::{ErrorKind, Result};
use crate::kind::ContentKind;
use exn::OptionExt;

/// Separates the filter id, hash and leaf fields of an encoded name.
pub const FIELD_SEPARATOR: char = '.';
/// Separates the leaf name from the trailing content kind code.
pub const KIND_SEPARATOR: char = ',';

/// The decoded identity of a rewritten resource.
///
/// Round-trips exactly: `decode(encode(name)) == name` for every name this
/// type will agree to construct. The constructor rejects field values that
/// would make the encoding ambiguous, so decoding never has to guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    filter_id: String,
    hash: String,
    leaf: String,
    kind: ContentKind,
}

fn contains_separator(value: &str) -> bool {
    value.contains(FIELD_SEPARATOR) || value.contains(KIND_SEPARATOR)
}

impl ResourceName {
    /// Build a name from its parts, validating each field.
    ///
    /// # Errors
    ///
    /// - [`InvalidFilterId`](ErrorKind::InvalidFilterId) unless the filter id
    ///   is exactly two separator-free ASCII characters.
    /// - [`InvalidHash`](ErrorKind::InvalidHash) for an empty hash or one
    ///   containing a separator.
    /// - [`InvalidLeafName`](ErrorKind::InvalidLeafName) for an empty leaf or
    ///   one containing a separator.
    pub fn new(
        filter_id: impl Into<String>,
        hash: impl Into<String>,
        leaf: impl Into<String>,
        kind: ContentKind,
    ) -> Result<Self> {
        let filter_id = filter_id.into();
        if filter_id.len() != 2 || !filter_id.is_ascii() || contains_separator(&filter_id) {
            exn::bail!(ErrorKind::InvalidFilterId(filter_id));
        }
        let hash = hash.into();
        if hash.is_empty() || contains_separator(&hash) {
            exn::bail!(ErrorKind::InvalidHash(hash));
        }
        let leaf = leaf.into();
        if leaf.is_empty() || contains_separator(&leaf) {
            exn::bail!(ErrorKind::InvalidLeafName(leaf));
        }
        Ok(Self { filter_id, hash, leaf, kind })
    }

    pub fn filter_id(&self) -> &str {
        &self.filter_id
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Produce the encoded form: `{filter_id}.{hash}.{leaf},{code}`.
    pub fn encode(&self) -> String {
        format!(
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{KIND_SEPARATOR}{}",
            self.filter_id,
            self.hash,
            self.leaf,
            self.kind.code(),
        )
    }

    /// Parse an encoded name back into its parts.
    ///
    /// # Errors
    ///
    /// - [`MalformedName`](ErrorKind::MalformedName) when the separator
    ///   structure does not match.
    /// - [`UnknownExtensionCode`](ErrorKind::UnknownExtensionCode) when the
    ///   trailing code is not in the content kind table.
    pub fn decode(encoded: &str) -> Result<Self> {
        let malformed = || ErrorKind::MalformedName(encoded.to_string());
        let (filter_id, rest) = encoded.split_once(FIELD_SEPARATOR).ok_or_raise(malformed)?;
        let (hash, tail) = rest.split_once(FIELD_SEPARATOR).ok_or_raise(malformed)?;
        let (leaf, code) = tail.split_once(KIND_SEPARATOR).ok_or_raise(malformed)?;
        let mut chars = code.chars();
        let (Some(code), None) = (chars.next(), chars.next()) else {
            exn::bail!(malformed());
        };
        let kind = ContentKind::from_code(code)?;
        // Re-validate through the constructor so decode accepts exactly the
        // set of names encode can produce.
        Self::new(filter_id, hash, leaf, kind).map_err(|_| exn::Exn::from(malformed()))
    }

    /// Decode the final path segment of a synthetic URL.
    ///
    /// The segment carries the canonical extension after the encoded name
    /// (`ce.0.a,s.css`); the extension is stripped and cross-checked against
    /// the kind embedded in the name.
    pub fn from_url_segment(segment: &str) -> Result<Self> {
        let malformed = || ErrorKind::MalformedName(segment.to_string());
        let (stem, extension) = segment.rsplit_once(FIELD_SEPARATOR).ok_or_raise(malformed)?;
        let name = Self::decode(stem)?;
        if extension != name.kind.extension() {
            exn::bail!(malformed());
        }
        Ok(name)
    }

    /// The final path segment of the synthetic URL for this name.
    pub fn url_segment(&self) -> String {
        format!("{}{FIELD_SEPARATOR}{}", self.encode(), self.kind.extension())
    }
}
