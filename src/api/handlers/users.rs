//! Account CRUD surface.
//!
//! Updates go through an allow-list DTO: email, password, and the verified
//! flag are not part of it, so payload keys outside the list are dropped by
//! deserialization rather than rejected.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;

use super::auth::storage::{self, ProfileChanges};
use super::auth::types::Account;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts, oldest first", body = [Account])
    ),
    tag = "users"
)]
pub async fn list_users(pool: Extension<PgPool>) -> Result<impl IntoResponse, ApiError> {
    let accounts = storage::list_accounts(&pool).await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account found", body = Account),
        (status = 404, description = "No account with this id", body = String)
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    match storage::find_account_by_id(&pool, id).await? {
        Some(account) => Ok(Json(account)),
        None => Err(ApiError::NotFound),
    }
}

/// Apply allow-listed profile changes.
///
/// A payload carrying only unknown or disallowed keys deserializes to an
/// all-`None` update; that still returns the current snapshot with 200.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated account snapshot", body = Account),
        (status = 400, description = "Missing payload", body = String),
        (status = 404, description = "No account with this id", body = String)
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let changes = ProfileChanges {
        first_name: request.first_name,
        last_name: request.last_name,
        country: request.country,
        image: request.image,
    };

    match storage::update_profile(&pool, id, changes).await? {
        Some(account) => {
            info!(account_id = %account.id, "Profile updated");
            Ok(Json(account))
        }
        None => Err(ApiError::NotFound),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "No account with this id", body = String)
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    if storage::delete_account(&pool, id).await? {
        info!(account_id = %id, "Account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
