//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let token_secret = matches
        .get_one::<String>("token-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --token-secret")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret,
        session_ttl_seconds: matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .unwrap_or(86400),
        verify_token_ttl_seconds: matches
            .get_one::<i64>("verify-token-ttl-seconds")
            .copied()
            .unwrap_or(86400),
        reset_token_ttl_seconds: matches
            .get_one::<i64>("reset-token-ttl-seconds")
            .copied()
            .unwrap_or(3600),
        bcrypt_cost: matches.get_one::<u32>("bcrypt-cost").copied().unwrap_or(10),
        email_outbox_poll_seconds: matches
            .get_one::<u64>("email-outbox-poll-seconds")
            .copied()
            .unwrap_or(5),
        email_outbox_batch_size: matches
            .get_one::<usize>("email-outbox-batch-size")
            .copied()
            .unwrap_or(10),
        email_outbox_max_attempts: matches
            .get_one::<u32>("email-outbox-max-attempts")
            .copied()
            .unwrap_or(5),
        email_outbox_backoff_base_seconds: matches
            .get_one::<u64>("email-outbox-backoff-base-seconds")
            .copied()
            .unwrap_or(5),
        email_outbox_backoff_max_seconds: matches
            .get_one::<u64>("email-outbox-backoff-max-seconds")
            .copied()
            .unwrap_or(300),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn token_secret_required() {
        temp_env::with_vars(
            [
                ("CUENTA_TOKEN_SECRET", None::<&str>),
                (
                    "CUENTA_DSN",
                    Some("postgres://user@localhost:5432/cuenta"),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["cuenta"]);
                // clap itself rejects the missing secret before dispatch
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn dispatch_builds_server_args() {
        temp_env::with_vars(
            [
                (
                    "CUENTA_DSN",
                    Some("postgres://user@localhost:5432/cuenta"),
                ),
                ("CUENTA_TOKEN_SECRET", Some("s3cret")),
                ("CUENTA_RESET_TOKEN_TTL_SECONDS", Some("600")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["cuenta", "--port", "9000"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 9000);
                    assert_eq!(args.dsn, "postgres://user@localhost:5432/cuenta");
                    assert_eq!(args.session_ttl_seconds, 86400);
                    assert_eq!(args.verify_token_ttl_seconds, 86400);
                    assert_eq!(args.reset_token_ttl_seconds, 600);
                    assert_eq!(args.bcrypt_cost, 10);
                    assert_eq!(args.email_outbox_batch_size, 10);
                }
            },
        );
    }
}
