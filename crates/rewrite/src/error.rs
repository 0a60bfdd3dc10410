//! Rewrite Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! The propagation policy is deliberately lopsided: per-reference and
//! per-script failures are absorbed at the filter boundary and degrade to
//! "leave the content unchanged". Only the serving path and genuine
//! infrastructure faults surface errors to callers.

use derive_more::{Display, Error};
use presto_naming::error::{Error as NamingError, ErrorKind as NamingErrorKind};
use presto_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// A rewrite error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rewrite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The origin resource could not be fetched (transport failure, timeout
    /// or non-2xx status). Filters respond by leaving the reference alone.
    #[display("origin fetch failed: {_0}")]
    FetchFailed(#[error(not(source))] String),
    /// The injected content transform rejected its input.
    #[display("content transform failed for {_0}")]
    TransformFailed(#[error(not(source))] String),
    /// The resource has no content kind in the registered table.
    #[display("unsupported content kind for {_0}")]
    UnsupportedContent(#[error(not(source))] String),
    /// A resource name could not be built or parsed.
    #[display("naming error: {_0}")]
    Naming(NamingErrorKind),
    /// The content store misbehaved.
    #[display("content store error: {_0}")]
    Store(StoreErrorKind),
    /// Serving-path miss after failed regeneration; surfaced to the caller
    /// as a not-found result.
    #[display("resource unavailable: {_0}")]
    ResourceUnavailable(#[error(not(source))] String),
}

impl ErrorKind {
    /// Convert a naming error into a rewrite error, preserving the naming
    /// crate's `Exn` frame (error tree) as a child in its own error tree.
    #[track_caller]
    pub fn naming(err: NamingError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Naming(inner))
    }

    /// Convert a store error into a rewrite error, preserving the store
    /// crate's `Exn` frame as a child.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Store(inner))
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed(_) => true,
            Self::Store(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}
