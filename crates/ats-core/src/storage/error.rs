//! Storage error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Attestation with this ID already exists
    #[error("attestation already exists: {0}")]
    AlreadyExists(String),

    /// Attestation not found
    #[error("attestation not found: {0}")]
    NotFound(String),

    /// Invalid attestation data
    #[error("invalid attestation data: {0}")]
    InvalidData(String),

    /// Storage backend error (database, filesystem, etc.)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Query error
    #[error("query error: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Ran out of vanity-id retry attempts
    #[error("could not allocate a unique ASID for subject '{0}'")]
    IdExhausted(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
