//! Password hashing and verification.
//!
//! bcrypt with a tunable work factor; the salt is embedded in the produced
//! hash and verification is constant-time. Mismatches and malformed hashes
//! both report `false` so callers cannot distinguish them.

use crate::api::error::ApiError;
use anyhow::anyhow;

/// Hash a plaintext password with the configured cost factor.
///
/// # Errors
///
/// Returns `ApiError::Hashing` if the underlying crypto fails; never exposes
/// the plaintext in the error.
pub(crate) fn hash_password(plaintext: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(plaintext, cost).map_err(|err| ApiError::Hashing(anyhow!(err)))
}

/// Check a plaintext password against a stored hash.
///
/// Returns false on mismatch or on a hash that fails to parse.
pub(crate) fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    // Minimum bcrypt cost keeps the test suite fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery", TEST_COST).ok();
        assert!(hash.is_some());
        if let Some(hash) = hash {
            assert!(verify_password("correct horse battery", &hash));
            assert!(!verify_password("wrong horse battery", &hash));
        }
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("password123", TEST_COST).ok();
        let second = hash_password("password123", TEST_COST).ok();
        assert!(first.is_some());
        assert!(second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("hunter2secret", TEST_COST).ok();
        assert!(hash.is_some());
        if let Some(hash) = hash {
            assert!(!hash.contains("hunter2secret"));
        }
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
        assert!(!verify_password("anything", ""));
    }
}
