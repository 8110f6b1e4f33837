//! End-to-end token lifecycle tests against a real database.
//!
//! These run only when `DATABASE_URL` points at a Postgres instance; without
//! it each test skips. Raw tokens are recovered the same way a user would get
//! them: from the link embedded in the outbox email body.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, sync::Arc};
use uuid::Uuid;

use cuenta::api::handlers::auth::{
    AuthConfig, AuthState, login::login, reset::complete_reset, reset::request_reset,
    signup::signup, types::Account, types::CompleteResetRequest, types::LoginRequest,
    types::LoginResponse, types::ResetRequest, types::SignupRequest, types::TokenReceipt,
    verification::verify_get,
};
use cuenta::api::handlers::users::get_user;

const VERIFY_MARKER: &str = "/verify_email/";
const RESET_MARKER: &str = "/reset_password/";
const FRONT_BASE_URL: &str = "https://front.example";

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = env::var("DATABASE_URL") else {
        eprintln!("Skipping integration test: DATABASE_URL is not set");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dsn)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    Ok(Some(pool))
}

fn test_state() -> Arc<AuthState> {
    Arc::new(AuthState::new(
        AuthConfig::new(SecretString::from("integration-test-secret")).with_bcrypt_cost(4),
    ))
}

fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4())
}

async fn read_json(response: axum::response::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("Failed to read response body")?;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).context("Response body is not JSON")?
    };
    Ok((status, value))
}

async fn create_account(
    pool: &PgPool,
    state: &Arc<AuthState>,
    email: &str,
    password: &str,
) -> Result<Account> {
    let request = SignupRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: Some("Inte".to_string()),
        last_name: Some("Gration".to_string()),
        country: None,
        image: None,
        front_base_url: FRONT_BASE_URL.to_string(),
    };
    let response = signup(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(request)),
    )
    .await
    .into_response();
    let (status, value) = read_json(response).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "signup returned {status}");
    serde_json::from_value(value).context("signup body is not an account")
}

/// Pull the raw token out of the latest outbox email for the address.
async fn latest_token(pool: &PgPool, email: &str, marker: &str) -> Result<String> {
    let body: String = sqlx::query_scalar(
        "SELECT body_html FROM email_outbox WHERE to_email = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .context("No outbox row for recipient")?;

    let start = body
        .find(marker)
        .with_context(|| format!("Email body has no {marker} link"))?
        + marker.len();
    let rest = &body[start..];
    let end = rest
        .find('"')
        .context("Unterminated link in email body")?;
    Ok(rest[..end].to_string())
}

async fn attempt_login(
    pool: &PgPool,
    state: &Arc<AuthState>,
    email: &str,
    password: &str,
) -> Result<(StatusCode, Value)> {
    let response = login(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })),
    )
    .await
    .into_response();
    read_json(response).await
}

#[tokio::test]
async fn signup_then_verify_flips_flag_and_consumes_token() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state();
    let email = unique_email();

    let account = create_account(&pool, &state, &email, "password123").await?;
    anyhow::ensure!(!account.is_verified, "new account must start unverified");

    let token = latest_token(&pool, &email, VERIFY_MARKER).await?;

    let response = verify_get(Path(token.clone()), Extension(pool.clone()))
        .await
        .into_response();
    let (status, value) = read_json(response).await?;
    anyhow::ensure!(status == StatusCode::OK, "verify returned {status}");
    let verified: Account = serde_json::from_value(value)?;
    anyhow::ensure!(verified.is_verified, "verify must flip the flag");
    anyhow::ensure!(verified.id == account.id);

    // The stored snapshot agrees with the verify response.
    let id = Uuid::parse_str(&account.id)?;
    let response = get_user(Path(id), Extension(pool.clone()))
        .await
        .into_response();
    let (status, value) = read_json(response).await?;
    anyhow::ensure!(status == StatusCode::OK);
    let fetched: Account = serde_json::from_value(value)?;
    anyhow::ensure!(fetched.is_verified);

    // Second consumption of the same token must fail, never re-grant.
    let response = verify_get(Path(token), Extension(pool.clone()))
        .await
        .into_response();
    anyhow::ensure!(
        response.status() == StatusCode::UNAUTHORIZED,
        "second verify must be rejected"
    );

    Ok(())
}

#[tokio::test]
async fn verify_token_is_rejected_by_the_reset_flow() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state();
    let email = unique_email();

    create_account(&pool, &state, &email, "password123").await?;
    let verify_token = latest_token(&pool, &email, VERIFY_MARKER).await?;

    // A live verify token presented against the reset endpoint must not
    // change the password.
    let response = complete_reset(
        Path(verify_token.clone()),
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(CompleteResetRequest {
            password: "hijacked-pass".to_string(),
        })),
    )
    .await
    .into_response();
    anyhow::ensure!(
        response.status() == StatusCode::UNAUTHORIZED,
        "cross-purpose replay must be rejected"
    );

    // The token still works for its own flow afterwards.
    let response = verify_get(Path(verify_token), Extension(pool.clone()))
        .await
        .into_response();
    anyhow::ensure!(response.status() == StatusCode::OK);

    let (status, _) = attempt_login(&pool, &state, &email, "password123").await?;
    anyhow::ensure!(status == StatusCode::OK, "password must be unchanged");

    Ok(())
}

#[tokio::test]
async fn expired_verify_token_is_rejected() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    // Negative TTL issues tokens already past their expiry.
    let state = Arc::new(AuthState::new(
        AuthConfig::new(SecretString::from("integration-test-secret"))
            .with_bcrypt_cost(4)
            .with_verify_token_ttl_seconds(-1),
    ));
    let email = unique_email();

    create_account(&pool, &state, &email, "password123").await?;
    let token = latest_token(&pool, &email, VERIFY_MARKER).await?;

    let response = verify_get(Path(token), Extension(pool.clone()))
        .await
        .into_response();
    anyhow::ensure!(
        response.status() == StatusCode::UNAUTHORIZED,
        "expired token must be rejected"
    );

    Ok(())
}

#[tokio::test]
async fn reset_flow_rotates_the_password_once() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = test_state();
    let email = unique_email();

    let account = create_account(&pool, &state, &email, "oldpassword1").await?;

    let response = request_reset(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(ResetRequest {
            email: email.clone(),
            front_base_url: FRONT_BASE_URL.to_string(),
        })),
    )
    .await
    .into_response();
    let (status, value) = read_json(response).await?;
    anyhow::ensure!(status == StatusCode::OK, "request reset returned {status}");
    let returned: Account = serde_json::from_value(value)?;
    anyhow::ensure!(returned.id == account.id);

    let token = latest_token(&pool, &email, RESET_MARKER).await?;

    let response = complete_reset(
        Path(token.clone()),
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(CompleteResetRequest {
            password: "newpassword1".to_string(),
        })),
    )
    .await
    .into_response();
    let (status, value) = read_json(response).await?;
    anyhow::ensure!(status == StatusCode::OK, "complete reset returned {status}");
    let receipt: TokenReceipt = serde_json::from_value(value)?;
    anyhow::ensure!(receipt.purpose == "reset_password");
    anyhow::ensure!(receipt.user_id == account.id);

    // New password logs in; the old one is rejected exactly like an unknown
    // email, status and body alike.
    let (status, value) = attempt_login(&pool, &state, &email, "newpassword1").await?;
    anyhow::ensure!(status == StatusCode::OK, "login with new password failed");
    let session: LoginResponse = serde_json::from_value(value)?;
    anyhow::ensure!(!session.token.is_empty());
    anyhow::ensure!(session.user.id == account.id);

    let (old_status, old_body) = attempt_login(&pool, &state, &email, "oldpassword1").await?;
    let (missing_status, missing_body) =
        attempt_login(&pool, &state, &unique_email(), "oldpassword1").await?;
    anyhow::ensure!(old_status == StatusCode::UNAUTHORIZED);
    anyhow::ensure!(missing_status == StatusCode::UNAUTHORIZED);
    anyhow::ensure!(
        old_body == missing_body,
        "login failure causes must be indistinguishable"
    );

    // The reset token was consumed; replaying it must fail.
    let response = complete_reset(
        Path(token),
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(CompleteResetRequest {
            password: "anotherpass1".to_string(),
        })),
    )
    .await
    .into_response();
    anyhow::ensure!(
        response.status() == StatusCode::UNAUTHORIZED,
        "consumed reset token must not be reusable"
    );

    Ok(())
}
