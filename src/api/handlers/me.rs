//! Authenticated self-service endpoint.

use axum::{Json, extract::Extension, http::HeaderMap, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;

use super::auth::session::require_auth;
use super::auth::state::AuthState;

/// Return the account behind the presented bearer token.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated account", body = super::auth::types::Account),
        (status = 401, description = "Missing, invalid, or expired token", body = String)
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (principal, account) = require_auth(&headers, &pool, &auth_state).await?;
    debug!(email = %principal.email, "Resolved session principal");
    Ok(Json(account))
}

#[cfg(test)]
mod tests {
    use super::super::auth::state::{AuthConfig, AuthState};
    use super::get_me;
    use axum::{extract::Extension, http::HeaderMap, response::IntoResponse};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_me_requires_token() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@127.0.0.1:1/unused")
            .expect("lazy pool");
        let state = Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "unit-test-secret",
        ))));
        let response = get_me(HeaderMap::new(), Extension(pool), Extension(state))
            .await
            .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
