//! Signed session tokens and authenticated principal extraction.
//!
//! Login issues a stateless HS256 token carrying the account identity with a
//! fixed expiry; protected routes present it as a bearer header. The signing
//! secret is loaded once at startup and read-only thereafter.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::Utc;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::ApiError;

use super::state::AuthState;
use super::storage::find_account_by_id;
use super::types::Account;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Account id.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for the given account.
pub(crate) fn sign_session(state: &AuthState, account: &Account) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: account.id.clone(),
        email: account.email.clone(),
        iat: now,
        exp: now + state.config().session_ttl_seconds(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, state.encoding_key())
        .map_err(|err| ApiError::Hashing(anyhow::anyhow!(err)))
}

/// Validate a session token's signature and expiry.
pub(crate) fn verify_session(state: &AuthState, token: &str) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, state.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|_| ApiError::InvalidCredentials)
}

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub(crate) struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Resolve the bearer token into a principal, or fail with 401.
///
/// The account must still exist: a valid token for a deleted account is
/// rejected the same way as a bad token.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<(Principal, Account), ApiError> {
    let token = extract_bearer_token(headers).ok_or(ApiError::InvalidCredentials)?;
    let claims = verify_session(state, &token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::InvalidCredentials)?;

    let Some(account) = find_account_by_id(pool, user_id).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    Ok((
        Principal {
            user_id,
            email: claims.email,
        },
        account,
    ))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::super::types::Account;
    use super::{extract_bearer_token, sign_session, verify_session};
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
    use secrecy::SecretString;

    fn test_state() -> AuthState {
        AuthState::new(AuthConfig::new(SecretString::from("unit-test-secret")))
    }

    fn test_account() -> Account {
        Account {
            id: "5f7b9a38-1a2b-4c3d-8e9f-000000000001".to_string(),
            email: "alice@example.com".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
            country: None,
            image: None,
            is_verified: false,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let state = test_state();
        let token = sign_session(&state, &test_account()).ok();
        assert!(token.is_some());
        if let Some(token) = token {
            let claims = verify_session(&state, &token).ok();
            assert!(claims.is_some());
            if let Some(claims) = claims {
                assert_eq!(claims.sub, test_account().id);
                assert_eq!(claims.email, "alice@example.com");
                assert_eq!(
                    claims.exp - claims.iat,
                    state.config().session_ttl_seconds()
                );
            }
        }
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let state = test_state();
        let other = AuthState::new(AuthConfig::new(SecretString::from("different-secret")));
        let token = sign_session(&state, &test_account()).ok();
        assert!(token.is_some());
        if let Some(token) = token {
            assert!(verify_session(&other, &token).is_err());
        }
    }

    #[test]
    fn verify_rejects_garbage() {
        let state = test_state();
        assert!(verify_session(&state, "not-a-token").is_err());
        assert!(verify_session(&state, "").is_err());
    }

    #[test]
    fn verify_rejects_expired() {
        // Negative TTL puts exp in the past, beyond the default leeway.
        let config =
            AuthConfig::new(SecretString::from("unit-test-secret")).with_session_ttl_seconds(-3600);
        let state = AuthState::new(config);
        let token = sign_session(&state, &test_account()).ok();
        assert!(token.is_some());
        if let Some(token) = token {
            assert!(verify_session(&state, &token).is_err());
        }
    }

    #[test]
    fn extract_bearer_token_parses_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_rejects_empty_or_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
