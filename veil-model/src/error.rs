//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when building schemas or converting rows.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An entity type was registered twice.
    #[error("entity type already registered: {0}")]
    DuplicateEntityType(String),

    /// A schema declares no primary-key column.
    #[error("entity type {0} declares no primary-key column")]
    MissingPrimaryKey(String),

    /// A schema references the same column name twice.
    #[error("entity type {entity} declares column {column} more than once")]
    DuplicateColumn { entity: String, column: String },

    /// Row serialization round-trip failure.
    #[error("row conversion failed: {0}")]
    Row(#[from] serde_json::Error),

    /// An entity serialized to something other than a JSON object.
    #[error("entity type {0} did not serialize to an object row")]
    NotAnObject(String),
}
