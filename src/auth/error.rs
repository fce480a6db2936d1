use axum::http::StatusCode;
use thiserror::Error;

use crate::otp::OtpError;

/// Failures of the auth protocols.
///
/// Messages are safe to show to callers: none of them carries a password,
/// an OTP code or the signing secret.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    NotFound,
    #[error("user already exists")]
    AlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("otp code was not approved")]
    OtpRejected,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("hashing error: {0}")]
    Hashing(String),
    #[error("token signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("otp provider error: {0}")]
    Adapter(#[from] OtpError),
    #[error("operation timed out")]
    Timeout,
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AuthError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::AlreadyExists,
            _ => AuthError::Store(e.to_string()),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::OtpRejected => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Adapter(_) => StatusCode::BAD_GATEWAY,
            AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Store(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message handed to HTTP callers. Internal failures collapse to a
    /// generic text; the detail only goes to the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
                "internal error".into()
            }
            AuthError::Adapter(_) => "otp provider unavailable".into(),
            other => other.to_string(),
        }
    }
}
