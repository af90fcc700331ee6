//! Error types for the repository layer.

use crate::engine::{EngineError, FieldError};
use thiserror::Error;
use veil_crypto::CryptoError;
use veil_model::ModelError;
use veil_query::QueryError;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced to repository callers.
///
/// All failures are typed; the layer performs no implicit retries and
/// never falls back to stale or partial data.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Malformed request (negative window, unknown include, duplicate keys
    /// in a batch). Caller error, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity type was never registered. Programmer error.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// `get_one` matched more than one row.
    #[error("query over {entity_type} matched more than one row")]
    MultipleResults { entity_type: &'static str },

    /// The engine rejected a save with field-level validation errors. The
    /// staged change-set is preserved for inspection and retry.
    #[error("{0}")]
    Validation(ValidationFailed),

    /// A stored value could not be decrypted.
    #[error("decryption failed: {0}")]
    Decryption(CryptoError),

    /// Row serialization round-trip failure.
    #[error("row conversion failed: {0}")]
    Row(#[from] ModelError),

    /// Engine-side failure.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Aggregated field-level validation failure from a save attempt.
///
/// Carries one descriptive message joining every field error, plus the
/// structured per-field list for programmatic inspection.
#[derive(Debug, Clone)]
pub struct ValidationFailed {
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ValidationFailed {
    #[must_use]
    pub fn new(errors: Vec<FieldError>) -> Self {
        let joined = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            message: format!("entity validation failed: {joined}"),
            errors,
        }
    }
}

impl std::fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<QueryError> for RepoError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            QueryError::UnknownEntityType(name) => Self::UnknownEntityType(name),
        }
    }
}

impl From<EngineError> for RepoError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(errors) => Self::Validation(ValidationFailed::new(errors)),
            EngineError::Crypto(e) => Self::Decryption(e),
            EngineError::Row(e) => Self::Row(e),
            EngineError::Backend(msg) => Self::Engine(msg),
        }
    }
}
