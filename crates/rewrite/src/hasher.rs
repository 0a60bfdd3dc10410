//! Content fingerprinting.

/// Produces the deterministic digest embedded in synthetic URLs.
///
/// The hash is the freshness key: identical transformed bytes must produce
/// identical hashes, and any change to the bytes must change the hash.
pub trait ContentHasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> String;
}

/// BLAKE3-based hasher, truncated to 16 hex characters.
///
/// Truncation keeps the synthetic URLs short; 64 bits of fingerprint is
/// plenty for cache-freshness identity, which only has to distinguish
/// versions of the same origin resource.
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn hash(&self, bytes: &[u8]) -> String {
        blake3::hash(bytes).to_hex()[..16].to_string()
    }
}

/// Hasher that always answers `"0"`, making synthetic URLs predictable.
///
/// Note:
/// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
pub struct StubHasher;

impl ContentHasher for StubHasher {
    fn hash(&self, _bytes: &[u8]) -> String {
        "0".to_string()
    }
}
