//! Per-response CSP nonces.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A fresh 128-bit nonce, hex encoded.
pub fn generate() -> String {
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&count.to_le_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

/// `Content-Security-Policy` value allowing same-origin and nonce-tagged scripts.
pub fn policy(nonce: &str) -> String {
    format!("script-src 'self' 'nonce-{nonce}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_shape_and_uniqueness() {
        let a = generate();
        let b = generate();
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_policy() {
        assert_eq!(policy("ab12"), "script-src 'self' 'nonce-ab12'");
    }
}
