//! Database-specific error types and conversions.

use mybank_core::error::BankError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error("Corrupt {entity} row: {detail}")]
    Decode { entity: String, detail: String },
}

impl DbError {
    pub(crate) fn decode(entity: &str, detail: impl std::fmt::Display) -> Self {
        DbError::Decode {
            entity: entity.into(),
            detail: detail.to_string(),
        }
    }

    /// Classify a failed write: unique-index and record-id collisions
    /// become [`DbError::Duplicate`].
    pub(crate) fn from_write(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") || message.contains("already exists") {
            DbError::Duplicate {
                entity: entity.into(),
                detail: message,
            }
        } else {
            DbError::Surreal(err)
        }
    }

    /// Whether the engine reported a transaction conflict that is safe
    /// to retry.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            DbError::Surreal(err) => {
                let message = err.to_string().to_lowercase();
                message.contains("can be retried") || message.contains("conflict")
            }
            _ => false,
        }
    }
}

impl From<DbError> for BankError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BankError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => BankError::AlreadyExists { entity },
            other => BankError::Database(other.to_string()),
        }
    }
}
