//! Naming Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every error in this crate is a local parse failure: callers recover by
//! declining the rewrite, never by aborting the document.

use derive_more::{Display, Error};

/// A naming error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for naming operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The leaf name contains one of the field separators and cannot be
    /// encoded unambiguously.
    #[display("leaf name contains a separator character: {_0}")]
    InvalidLeafName(#[error(not(source))] String),
    /// The filter id is not exactly two separator-free ASCII characters.
    #[display("invalid filter id: {_0}")]
    InvalidFilterId(#[error(not(source))] String),
    /// The content hash is empty or contains a separator character.
    #[display("invalid content hash: {_0}")]
    InvalidHash(#[error(not(source))] String),
    /// The separator structure of an encoded name does not match.
    #[display("malformed resource name: {_0}")]
    MalformedName(#[error(not(source))] String),
    /// The trailing code is not in the registered content kind table.
    #[display("unknown extension code: {_0:?}")]
    UnknownExtensionCode(#[error(not(source))] char),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A name is either well-formed or it's not.
        false
    }
}
