//! # Cuenta (User Accounts & Email Verification)
//!
//! `cuenta` is a user-account service exposing account creation,
//! authentication, email verification, and password-reset flows over HTTP,
//! backed by `PostgreSQL`.
//!
//! ## Verification tokens
//!
//! Signup and password-reset flows mint single-use opaque tokens (256 bits of
//! `OsRng` randomness, URL-safe base64). Only a SHA-256 hash of the token is
//! stored; each row carries an explicit purpose (`verify_email` or
//! `reset_password`) and an expiry, and consumption is an atomic
//! `DELETE ... RETURNING` so a token can never be redeemed twice or replayed
//! against the wrong flow.
//!
//! ## Credentials & sessions
//!
//! Passwords are bcrypt-hashed with a tunable cost factor and verified in
//! constant time; the database never sees plaintext. Login issues a signed
//! session token (HS256) carrying the account identity with a fixed expiry.
//! Lookup and password failures are indistinguishable to the caller.
//!
//! ## Email delivery
//!
//! Outbound mail goes through a database outbox: rows are enqueued in the
//! same transaction as the triggering state change, and a background worker
//! delivers them best-effort with retry/backoff. A failed send never rolls
//! back the account or token it belongs to.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
