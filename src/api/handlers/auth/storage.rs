//! Database helpers for accounts, one-time tokens, and the email outbox.
//!
//! All writes that must stay consistent (account + token + outbox row) run in
//! one transaction. Token consumption is a single `DELETE ... RETURNING`
//! filtered by purpose and expiry, so double consumption and cross-flow
//! replay resolve to "no row" without any in-process coordination.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::state::AuthConfig;
use super::types::{Account, TokenReceipt};
use super::utils::{
    build_reset_url, build_verify_url, generate_token, hash_token, is_unique_violation,
    render_reset_email, render_verification_email,
};

/// Purpose tag carried by every one-time token. Lookups always filter on it,
/// so a verify token cannot be replayed against the reset flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify_email",
            Self::ResetPassword => "reset_password",
        }
    }
}

/// Outcome when attempting to create a new account + verification record.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created(Account),
    Conflict,
}

/// Fields for a new account row. The password is already hashed.
#[derive(Debug)]
pub(crate) struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
}

/// Allow-listed profile changes. Email, password, and the verified flag are
/// not representable here; they only change through their dedicated flows.
#[derive(Debug, Default)]
pub(crate) struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
}

/// Account row plus the credential fields needed by login and reset.
pub(crate) struct CredentialRecord {
    pub user_id: Uuid,
    pub password_hash: String,
    pub account: Account,
}

/// A consumed one-time token, returned by the atomic delete.
pub(crate) struct ConsumedToken {
    pub user_id: Uuid,
    pub token_id: String,
    pub issued_at: String,
}

impl ConsumedToken {
    pub(crate) fn into_receipt(self, purpose: TokenPurpose) -> TokenReceipt {
        TokenReceipt {
            id: self.token_id,
            user_id: self.user_id.to_string(),
            purpose: purpose.as_str().to_string(),
            issued_at: self.issued_at,
        }
    }
}

const ACCOUNT_COLUMNS: &str = r#"
    id::text AS id,
    id AS raw_id,
    email,
    first_name,
    last_name,
    country,
    image,
    is_verified,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
"#;

fn map_account(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        country: row.get("country"),
        image: row.get("image"),
        is_verified: row.get("is_verified"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(crate) async fn list_accounts(pool: &PgPool) -> Result<Vec<Account>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY created_at ASC");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list accounts")?;
    Ok(rows.iter().map(map_account).collect())
}

pub(crate) async fn find_account_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;
    Ok(row.as_ref().map(map_account))
}

/// Look up credential data by normalized email (login and reset flows).
pub(crate) async fn find_credentials_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<CredentialRecord>> {
    let query =
        format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM users WHERE email = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;

    Ok(row.map(|row| CredentialRecord {
        user_id: row.get("raw_id"),
        password_hash: row.get("password_hash"),
        account: map_account(&row),
    }))
}

/// Create an account, its verification token, and the outbox row in one
/// transaction. The unique index on email resolves duplicate signups.
pub(crate) async fn create_account(
    pool: &PgPool,
    new: NewAccount,
    config: &AuthConfig,
    front_base_url: &str,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = format!(
        r"
        INSERT INTO users (email, password_hash, first_name, last_name, country, image)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.country)
        .bind(&new.image)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let row = match row {
        Ok(row) => row,
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert account");
        }
    };

    let account = map_account(&row);
    let user_id: Uuid = row.get("raw_id");

    let token = issue_token(
        &mut tx,
        user_id,
        TokenPurpose::VerifyEmail,
        config.verify_token_ttl_seconds(),
    )
    .await?;

    let verify_url = build_verify_url(front_base_url, &token);
    let (subject, body) = render_verification_email(new.first_name.as_deref(), &verify_url);
    enqueue_email(&mut tx, &new.email, &subject, &body).await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created(account))
}

/// Issue a reset token and enqueue the reset email in one transaction.
pub(crate) async fn issue_password_reset(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
    front_base_url: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let token = issue_token(
        &mut tx,
        user_id,
        TokenPurpose::ResetPassword,
        config.reset_token_ttl_seconds(),
    )
    .await?;

    let reset_url = build_reset_url(front_base_url, &token);
    let (subject, body) = render_reset_email(&reset_url);
    enqueue_email(&mut tx, email, &subject, &body).await?;

    tx.commit().await.context("commit reset transaction")?;
    Ok(())
}

/// Generate a raw token, store only its hash with purpose and expiry, and
/// return the raw value for the email link.
pub(crate) async fn issue_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_seconds: i64,
) -> Result<String> {
    let token = generate_token()?;
    let token_hash = hash_token(&token);

    let query = r"
        INSERT INTO account_tokens (user_id, token_hash, purpose, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(purpose.as_str())
        .bind(ttl_seconds)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert account token")?;

    Ok(token)
}

/// Consume a one-time token: atomic delete-if-valid.
///
/// Returns `None` for unknown, expired, already-consumed, or wrong-purpose
/// tokens; the caller cannot tell these apart.
pub(crate) async fn consume_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    token_hash: &[u8],
    purpose: TokenPurpose,
) -> Result<Option<ConsumedToken>> {
    let query = r#"
        DELETE FROM account_tokens
        WHERE token_hash = $1
          AND purpose = $2
          AND expires_at > NOW()
        RETURNING
            id::text AS token_id,
            user_id,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS issued_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume token")?;

    Ok(row.map(|row| ConsumedToken {
        user_id: row.get("user_id"),
        token_id: row.get("token_id"),
        issued_at: row.get("issued_at"),
    }))
}

/// Flip the verified flag. Re-verifying an already-verified account is a
/// harmless no-op; a missing row means the account was deleted while the
/// token was outstanding.
pub(crate) async fn mark_verified(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<Option<Account>> {
    let query = format!(
        r"
        UPDATE users
        SET is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark account verified")?;
    Ok(row.as_ref().map(map_account))
}

/// Replace the stored password hash (reset flow only).
pub(crate) async fn update_password(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(result.rows_affected() > 0)
}

/// Apply allow-listed profile changes and return the fresh snapshot.
///
/// All-`None` changes still return the current row, matching the observed
/// behavior of updates whose payload only carried disallowed keys.
pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    changes: ProfileChanges,
) -> Result<Option<Account>> {
    let query = format!(
        r"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            country = COALESCE($4, country),
            image = COALESCE($5, image),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.country)
        .bind(changes.image)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update profile")?;
    Ok(row.as_ref().map(map_account))
}

pub(crate) async fn delete_account(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    // Outstanding tokens go with the account via ON DELETE CASCADE.
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete account")?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn enqueue_email(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    to_email: &str,
    subject: &str,
    body_html: &str,
) -> Result<()> {
    let query = r"
        INSERT INTO email_outbox (to_email, subject, body_html)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(to_email)
        .bind(subject)
        .bind(body_html)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert email outbox row")?;
    Ok(())
}
