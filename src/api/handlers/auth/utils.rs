//! Small helpers for input validation and one-time token handling.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Minimum password length accepted on signup and reset.
pub(crate) fn valid_password(password: &str) -> bool {
    password.len() >= 8
}

/// Create a new one-time token for email links.
///
/// 256 bits of CSPRNG output, URL-safe base64 without padding so the token
/// can travel as a path segment. The raw value is only sent to the user; the
/// database stores a hash.
pub(crate) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a one-time token so the raw value never touches the database.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Check that a frontend base URL parses and carries a host, so the token
/// links built from it are well-formed.
pub(crate) fn valid_base_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|parsed| parsed.has_host())
}

/// Build the frontend verification link included in outbound emails.
pub(crate) fn build_verify_url(front_base_url: &str, token: &str) -> String {
    let base = front_base_url.trim_end_matches('/');
    format!("{base}/verify_email/{token}")
}

/// Build the frontend password-reset link included in outbound emails.
pub(crate) fn build_reset_url(front_base_url: &str, token: &str) -> String {
    let base = front_base_url.trim_end_matches('/');
    format!("{base}/reset_password/{token}")
}

/// Render the verification email for a freshly created account.
pub(crate) fn render_verification_email(
    first_name: Option<&str>,
    verify_url: &str,
) -> (String, String) {
    let greeting = first_name
        .filter(|name| !name.trim().is_empty())
        .map_or_else(|| "Hello!".to_string(), |name| format!("Hello {name}!"));
    let subject = "Verify your account".to_string();
    let body = format!(
        "<div><h1>{greeting}</h1>\
         <p>Thanks for signing up. Click the link below to verify your account:</p>\
         <p><a href=\"{verify_url}\">Verify my account</a></p></div>"
    );
    (subject, body)
}

/// Render the password-reset email.
pub(crate) fn render_reset_email(reset_url: &str) -> (String, String) {
    let subject = "Reset your password".to_string();
    let body = format!(
        "<div><h1>Reset your password</h1>\
         <p>We received a request to reset the password for your account. \
         Click the link below to continue:</p>\
         <p><a href=\"{reset_url}\">Reset my password</a></p></div>"
    );
    (subject, body)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
