//! Request/response types for the account and auth endpoints.
//!
//! The wire contract is camelCase; internal names stay snake_case.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public account snapshot. The password hash is never serialized.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
    /// Base URL the verification link is built from.
    pub front_base_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Account,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub email: String,
    /// Base URL the reset link is built from.
    pub front_base_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResetRequest {
    pub password: String,
}

/// Confirmation data for a consumed token.
///
/// Completing a reset returns this receipt rather than the updated account;
/// callers wanting the fresh account re-fetch it.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenReceipt {
    pub id: String,
    pub user_id: String,
    pub purpose: String,
    pub issued_at: String,
}
