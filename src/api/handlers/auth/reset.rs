//! Password reset: request a reset link, then complete with a new password.

use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{
    TokenPurpose, consume_token, find_credentials_by_email, issue_password_reset, update_password,
};
use super::types::{CompleteResetRequest, ResetRequest, TokenReceipt};
use super::utils::{hash_token, normalize_email, valid_base_url, valid_password};

/// Request a password-reset email.
///
/// An unknown email returns 401, so this endpoint reveals account existence.
/// Reset tokens expire sooner than verification tokens.
#[utoipa::path(
    post,
    path = "/reset",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Reset email enqueued", body = super::types::Account),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Unknown email", body = String)
    ),
    tag = "auth"
)]
pub async fn request_reset(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    if !valid_base_url(&request.front_base_url) {
        return Err(ApiError::Validation("Invalid frontBaseUrl".to_string()));
    }

    let email = normalize_email(&request.email);

    let Some(record) = find_credentials_by_email(&pool, &email).await? else {
        return Err(ApiError::AccountNotFound);
    };

    issue_password_reset(
        &pool,
        record.user_id,
        &record.account.email,
        auth_state.config(),
        &request.front_base_url,
    )
    .await?;

    info!(account_id = %record.account.id, "Password reset requested");

    Ok(Json(record.account))
}

/// Complete a password reset with the emailed token and a new password.
///
/// Returns the consumed-token receipt; the session, if any, stays untouched.
#[utoipa::path(
    post,
    path = "/reset/{code}",
    params(("code" = String, Path, description = "Raw reset token from the email link")),
    request_body = CompleteResetRequest,
    responses(
        (status = 200, description = "Password updated", body = TokenReceipt),
        (status = 400, description = "Missing payload or weak password", body = String),
        (status = 401, description = "Invalid, expired, or already used token", body = String)
    ),
    tag = "auth"
)]
pub async fn complete_reset(
    Path(code): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CompleteResetRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    if !valid_password(&request.password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    let token_hash = hash_token(code);

    // Hash before opening the transaction; bcrypt is the slow part.
    let password_hash = hash_password(&request.password, auth_state.config().bcrypt_cost())?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| ApiError::Storage(err.into()))?;

    let Some(consumed) = consume_token(&mut tx, &token_hash, TokenPurpose::ResetPassword).await?
    else {
        let _ = tx.rollback().await;
        return Err(ApiError::InvalidToken);
    };

    if !update_password(&mut tx, consumed.user_id, &password_hash).await? {
        let _ = tx.rollback().await;
        return Err(ApiError::InvalidToken);
    }

    tx.commit()
        .await
        .map_err(|err| ApiError::Storage(err.into()))?;

    let receipt = consumed.into_receipt(TokenPurpose::ResetPassword);

    info!(account_id = %receipt.user_id, "Password reset completed");

    Ok(Json(receipt))
}
