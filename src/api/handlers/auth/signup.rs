//! Account signup.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{NewAccount, SignupOutcome, create_account};
use super::types::SignupRequest;
use super::utils::{normalize_email, valid_base_url, valid_email, valid_password};

/// Create an account and enqueue the verification email.
///
/// The account row, the hashed verification token, and the outbox row are
/// written in one transaction, so a created account always has a pending
/// verification email.
#[utoipa::path(
    post,
    path = "/users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = super::types::Account),
        (status = 400, description = "Invalid email or password", body = String),
        (status = 409, description = "Email already in use", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }
    if !valid_password(&request.password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if !valid_base_url(&request.front_base_url) {
        return Err(ApiError::Validation("Invalid frontBaseUrl".to_string()));
    }

    let password_hash = hash_password(&request.password, auth_state.config().bcrypt_cost())?;

    let new = NewAccount {
        email,
        password_hash,
        first_name: normalize_optional(request.first_name),
        last_name: normalize_optional(request.last_name),
        country: normalize_optional(request.country),
        image: normalize_optional(request.image),
    };

    match create_account(&pool, new, auth_state.config(), &request.front_base_url).await? {
        SignupOutcome::Created(account) => {
            info!(account_id = %account.id, "Account created");
            Ok((StatusCode::CREATED, Json(account)))
        }
        SignupOutcome::Conflict => Err(ApiError::DuplicateEmail),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
