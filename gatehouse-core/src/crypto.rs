//! Digest and comparison helpers
//!
//! Device fingerprints are SHA-256 digests, hex-encoded. Comparing a stored
//! fingerprint against a freshly computed one goes through [`constant_time_compare`]
//! so a mismatch does not leak how many leading characters were right.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash arbitrary input with SHA-256.
///
/// # Returns
///
/// The lowercase hex encoding of the digest (64 characters)
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Perform constant-time comparison of two byte slices.
///
/// Slices of different length compare unequal immediately; the length of a hex
/// digest is public anyway.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sha256_hex("device"), sha256_hex("device"));
        assert_ne!(sha256_hex("device_a"), sha256_hex("device_b"));
    }

    #[test]
    fn test_hash_produces_hex_string() {
        let hash = sha256_hex("anything");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(constant_time_compare(b"", b""));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
