//! API error taxonomy and HTTP status mapping.
//!
//! Domain failures map to 4xx responses with a small JSON body; storage and
//! crypto failures are logged server-side and surface as an opaque 500 so no
//! internals leak to the caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// Signup with an email that already has an account (409).
    #[error("Email already in use")]
    DuplicateEmail,

    /// Unknown email or wrong password. The two causes are deliberately
    /// indistinguishable so login responses never reveal account existence.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Verification/reset token missing, expired, already consumed, or
    /// presented against the wrong flow (401).
    #[error("Invalid token")]
    InvalidToken,

    /// Password-reset request for an unknown email (401). Unlike login this
    /// path reveals account existence; preserved as observed behavior.
    #[error("User not found")]
    AccountNotFound,

    /// Resource lookup miss on the CRUD surface (404).
    #[error("Not found")]
    NotFound,

    /// Database failure (500).
    #[error("Internal error")]
    Storage(#[source] anyhow::Error),

    /// Password hashing or token signing failure (500).
    #[error("Internal error")]
    Hashing(#[source] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::InvalidToken | Self::AccountNotFound => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Full error chain goes to the log, never to the caller.
            match &self {
                Self::Storage(err) | Self::Hashing(err) => error!("{self}: {err:#}"),
                _ => error!("{self}"),
            }
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
