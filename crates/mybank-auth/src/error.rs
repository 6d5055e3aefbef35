//! Authentication error types.

use mybank_core::error::BankError;
use thiserror::Error;

use crate::session::SessionRejection;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("{0}")]
    SessionRejected(SessionRejection),

    #[error("token secret must be at least {min} bytes")]
    WeakSecret { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("invalid auth configuration: {0}")]
    InvalidConfig(String),
}

impl From<AuthError> for BankError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => BankError::InvalidCredentials,
            AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::SessionRejected(_) => BankError::InvalidToken {
                reason: err.to_string(),
            },
            AuthError::WeakSecret { .. } | AuthError::Crypto(_) => {
                BankError::Crypto(err.to_string())
            }
            AuthError::InvalidConfig(_) => BankError::Internal(err.to_string()),
        }
    }
}
