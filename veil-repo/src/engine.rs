//! The execution-engine boundary.
//!
//! The repository composes queries and stages changes; an engine executes
//! them. Engines own their connection, translate the filter AST, apply
//! column encryption at the row boundary and commit staged change-sets
//! all-or-nothing.

use crate::context::StagedOp;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use veil_crypto::CryptoError;
use veil_model::{Entity, ModelError};
use veil_query::{AbstractQuery, Filter};
use veil_types::Value;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from an execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The change-set was rejected with field-level validation errors.
    /// Nothing was committed.
    #[error("validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),

    /// Column encryption/decryption failure at the row boundary.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Row serialization round-trip failure.
    #[error("row error: {0}")]
    Row(#[from] ModelError),

    /// Backend-specific failure (connection, SQL, storage).
    #[error("{0}")]
    Backend(String),
}

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a committed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Rows affected by the committed change-set.
    pub rows_affected: u64,
}

/// Executes composed queries and staged change-sets.
///
/// `fetch_by_key` must use the engine's direct key-lookup path, not a
/// predicate scan. `count`/`exists` are proper aggregates; engines never
/// materialize rows to count them. `save` is all-or-nothing: a validation
/// failure commits nothing and reports every field error it found.
pub trait ExecutionEngine {
    fn fetch<E: Entity>(&self, query: &AbstractQuery) -> EngineResult<Vec<E>>;

    fn fetch_by_key<E: Entity>(&self, key: &Value) -> EngineResult<Option<E>>;

    fn count(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<u64>;

    fn exists(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<bool>;

    /// Executes a hand-authored query returning entity rows. The SQL is
    /// passed through verbatim with its parameters; it is never assembled
    /// from caller values here.
    fn fetch_raw<E: Entity>(&self, sql: &str, params: &[Value]) -> EngineResult<Vec<E>>;

    /// Executes a non-entity statement, returning the affected-row count.
    fn execute_sql(&self, sql: &str, params: &[Value]) -> EngineResult<u64>;

    fn save(&self, ops: &[StagedOp]) -> EngineResult<SaveReport>;

    /// Adjusts the per-statement timeout for subsequent commands.
    fn set_command_timeout(&self, timeout: Duration);
}
