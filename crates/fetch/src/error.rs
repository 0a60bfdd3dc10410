//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Note that a non-2xx response is *not* an error here: the transfer worked,
/// and what to do about the status is the caller's decision.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[display("invalid fetch url: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The transfer itself failed (DNS, connection reset, TLS, etc.).
    #[display("transport error fetching {_0}")]
    Transport(#[error(not(source))] String),
    /// The fetch did not complete within the configured deadline.
    #[display("timed out fetching {_0}")]
    Timeout(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
