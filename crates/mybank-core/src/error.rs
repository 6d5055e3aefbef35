//! Error types for the MyBank core.
//!
//! Every service-level failure is a [`BankError`]. Each variant maps to
//! exactly one public [`ErrorClass`]; storage, crypto, and other
//! unclassified causes collapse into [`ErrorClass::Internal`] and keep
//! their detail only for diagnostics.

use serde::Serialize;
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("invalid parameters: {}", format_fields(.errors))]
    InvalidParams { errors: Vec<FieldError> },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("account {account_id} has non-zero balance {balance}")]
    BalanceNotZero { account_id: String, balance: i64 },

    #[error("operation cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BankResult<T> = Result<T, BankError>;

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Public error class tag exposed at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InvalidParams,
    InvalidCredentials,
    InvalidToken,
    Forbidden,
    NotFound,
    AlreadyExists,
    BalanceNotZero,
    Cancelled,
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::BalanceNotZero => "balance_not_zero",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BankError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidParams { .. } => ErrorClass::InvalidParams,
            Self::InvalidCredentials => ErrorClass::InvalidCredentials,
            Self::InvalidToken { .. } => ErrorClass::InvalidToken,
            Self::Forbidden { .. } => ErrorClass::Forbidden,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::AlreadyExists { .. } => ErrorClass::AlreadyExists,
            Self::BalanceNotZero { .. } => ErrorClass::BalanceNotZero,
            Self::Cancelled { .. } => ErrorClass::Cancelled,
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Shorthand for an [`InvalidToken`](Self::InvalidToken) with a
    /// diagnostic reason.
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`Forbidden`](Self::Forbidden) with a diagnostic
    /// reason.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Project this error into the structured body handed to the
    /// transport layer.
    ///
    /// Token and ownership reasons, storage messages, and crypto
    /// details stay server-side; callers only see the class and a
    /// fixed message per class.
    pub fn to_body(&self) -> ErrorBody {
        let class = self.class();
        let message = match self {
            Self::InvalidParams { .. } => "request parameters are invalid",
            Self::InvalidCredentials => "invalid username or password",
            Self::InvalidToken { .. } => "token is invalid",
            Self::Forbidden { .. } => "operation not permitted",
            Self::NotFound { .. } => "resource not found",
            Self::AlreadyExists { .. } => "resource already exists",
            Self::BalanceNotZero { .. } => "account balance must be zero",
            Self::Cancelled { .. } => "request cancelled",
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => "internal error",
        };
        let fields = match self {
            Self::InvalidParams { errors } => errors.clone(),
            _ => Vec::new(),
        };
        ErrorBody {
            class,
            message: message.to_string(),
            fields,
        }
    }
}

/// Structured failure returned across the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub class: ErrorClass,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl From<BankError> for ErrorBody {
    fn from(err: BankError) -> Self {
        err.to_body()
    }
}
