//! Content transforms applied while materializing output resources.

use crate::error::Result;

/// A pure bytes-to-bytes transformation owned by a filter.
///
/// Determinism is load-bearing: the output hash doubles as the artifact's
/// identity, so the same input must always yield the same output. The
/// actual minification algorithm is injected through this trait; this crate
/// never inspects script semantics itself.
pub trait ContentTransform: Send + Sync {
    fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// The do-nothing transform used by cache extension, where only the URL
/// identity changes and the bytes pass through untouched.
pub struct IdentityTransform;

impl ContentTransform for IdentityTransform {
    fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_bytes_through() {
        let bytes = b"alert('hello, world!')";
        assert_eq!(IdentityTransform.apply(bytes).unwrap(), bytes);
    }
}
