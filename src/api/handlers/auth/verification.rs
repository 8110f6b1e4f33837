//! Email verification endpoints.
//!
//! The link lands as `GET /verify/{code}`; `POST` is also accepted for
//! clients that confirm programmatically. Both consume the token and flip
//! the verified flag in one transaction.

use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use sqlx::PgPool;
use tracing::info;

use crate::api::error::ApiError;

use super::storage::{TokenPurpose, consume_token, mark_verified};
use super::types::Account;
use super::utils::hash_token;

#[utoipa::path(
    get,
    path = "/verify/{code}",
    params(("code" = String, Path, description = "Raw verification token from the email link")),
    responses(
        (status = 200, description = "Account verified", body = Account),
        (status = 401, description = "Invalid, expired, or already used token", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_get(
    Path(code): Path<String>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    verify(&pool, &code).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/verify/{code}",
    params(("code" = String, Path, description = "Raw verification token from the email link")),
    responses(
        (status = 200, description = "Account verified", body = Account),
        (status = 401, description = "Invalid, expired, or already used token", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_post(
    Path(code): Path<String>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    verify(&pool, &code).await.map(Json)
}

/// Consume the verification token and activate the account.
///
/// The token row is deleted and the flag flipped in one transaction, so a
/// second request with the same code finds nothing and fails like any other
/// bad token.
async fn verify(pool: &PgPool, code: &str) -> Result<Account, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    // Raw tokens are never stored; lookup is by hash.
    let token_hash = hash_token(code);

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| ApiError::Storage(err.into()))?;

    let Some(consumed) = consume_token(&mut tx, &token_hash, TokenPurpose::VerifyEmail).await?
    else {
        let _ = tx.rollback().await;
        return Err(ApiError::InvalidToken);
    };

    // The account may have been deleted while the token was outstanding.
    let Some(account) = mark_verified(&mut tx, consumed.user_id).await? else {
        let _ = tx.rollback().await;
        return Err(ApiError::InvalidToken);
    };

    tx.commit()
        .await
        .map_err(|err| ApiError::Storage(err.into()))?;

    info!(account_id = %account.id, "Account verified");

    Ok(account)
}
