//! Signup, login, email verification, and password reset.

pub mod login;
pub(crate) mod password;
pub mod reset;
pub(crate) mod session;
pub mod signup;
pub(crate) mod state;
pub(crate) mod storage;
pub mod types;
pub(crate) mod utils;
pub mod verification;

pub use state::{AuthConfig, AuthState};
