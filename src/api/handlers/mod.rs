//! API handlers for the account service.
//!
//! Route handlers for signup/login/verification/reset live under `auth`;
//! the account CRUD surface is in `users`.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
pub mod users;
