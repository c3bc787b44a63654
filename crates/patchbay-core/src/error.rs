//! Error types for the patchbay system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchbayError {
    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: String, key: String },

    #[error("Entity already exists: {entity} with key {key}")]
    AlreadyExists { entity: String, key: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PatchbayResult<T> = Result<T, PatchbayError>;
