//! Database-specific error types and conversions.

use patchbay_core::error::PatchbayError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with key {key}")]
    NotFound { entity: String, key: String },

    #[error("Record already exists: {entity} with key {key}")]
    AlreadyExists { entity: String, key: String },
}

impl From<DbError> for PatchbayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, key } => PatchbayError::NotFound { entity, key },
            DbError::AlreadyExists { entity, key } => PatchbayError::AlreadyExists { entity, key },
            other => PatchbayError::Database(other.to_string()),
        }
    }
}
