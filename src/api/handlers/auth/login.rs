//! Password login issuing a signed session token.

use axum::{Json, extract::Extension, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;

use super::password::verify_password;
use super::session::sign_session;
use super::state::AuthState;
use super::storage::find_credentials_by_email;
use super::types::{LoginRequest, LoginResponse};
use super::utils::normalize_email;

/// Authenticate with email and password.
///
/// Unknown email and wrong password return the same 401; the lookup miss
/// short-circuits before any password work.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);

    let Some(record) = find_credentials_by_email(&pool, &email).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&request.password, &record.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = sign_session(&auth_state, &record.account)?;

    info!(account_id = %record.account.id, "Login succeeded");

    Ok(Json(LoginResponse {
        user: record.account,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::login;
    use axum::{extract::Extension, response::IntoResponse};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn login_requires_payload() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@127.0.0.1:1/unused")
            .expect("lazy pool");
        let state = Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "unit-test-secret",
        ))));
        let response = login(Extension(pool), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
