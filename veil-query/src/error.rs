//! Error types for query composition.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while composing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Malformed spec: negative window values, unknown include names.
    /// Caller error, fails fast, never retried.
    #[error("invalid query argument: {0}")]
    InvalidArgument(String),

    /// The entity type was never registered. Programmer error, fatal at
    /// the call site.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
}
