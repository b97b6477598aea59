//! Failures raised while issuing or checking a session.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases share one message so
    /// callers cannot tell which accounts exist.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No token provided")]
    NoToken,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is not active")]
    AccountInactive,
}

impl AuthError {
    /// Machine-readable identifier used in error responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::NoToken => "no_token",
            AuthError::Revoked => "token_revoked",
            AuthError::Expired => "token_expired",
            AuthError::Malformed => "token_malformed",
            AuthError::UserNotFound => "user_not_found",
            AuthError::AccountInactive => "account_inactive",
        }
    }
}
