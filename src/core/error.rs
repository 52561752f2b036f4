// src/core/error.rs
use thiserror::Error;

/// Errors raised by the repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Invalid(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
