use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Storage-layer failures shared by every store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write; the only retryable failure
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The row was not in one of the states the atomic unit required
    #[error("{entity_id} is in state {current}, which this operation does not allow")]
    StateConflict { entity_id: String, current: String },

    #[error("Quote {quote_id} expired at {expired_at}")]
    QuoteExpired {
        quote_id: Uuid,
        expired_at: DateTime<Utc>,
    },

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        Self::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
