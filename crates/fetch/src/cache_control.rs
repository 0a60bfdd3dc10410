//! Digesting `Cache-Control` into a single TTL.

use std::time::Duration;

/// Reduce a `Cache-Control` header value to the origin's declared TTL.
///
/// Returns `None` when the header says nothing about freshness. An explicit
/// "don't cache me" directive (`no-store`, `no-cache`, `private`) wins over
/// any `max-age` in the same header and comes back as a zero TTL, which is
/// how the rest of the system spells "uncacheable".
pub fn ttl_from_cache_control(value: &str) -> Option<Duration> {
    let mut max_age = None;
    for directive in value.split(',') {
        let directive = directive.trim();
        let lower = directive.to_ascii_lowercase();
        if lower == "no-store" || lower == "no-cache" || lower == "private" {
            return Some(Duration::ZERO);
        }
        if let Some(seconds) = lower.strip_prefix("max-age=")
            && let Ok(seconds) = seconds.trim().parse::<u64>()
        {
            max_age = Some(Duration::from_secs(seconds));
        }
    }
    max_age
}
