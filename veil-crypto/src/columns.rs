//! Per-column converter binding.
//!
//! The model-configuration pass: walk every registered schema once at
//! startup and bind a converter for every column marked `encrypted`. The
//! result is an explicit static mapping consulted by engines at the row
//! boundary — no runtime reflection, no per-call scanning.

use crate::error::CryptoResult;
use crate::provider::EncryptionProvider;
use std::collections::HashMap;
use std::sync::Arc;
use veil_model::{ColumnKind, SchemaRegistry};

/// The bound set of encrypted columns, plus the provider that transforms
/// them.
///
/// `encrypt_row` / `decrypt_row` are called by engines on the flat JSON
/// row immediately before write and immediately after read. Columns whose
/// current value is JSON `null` pass through untouched.
pub struct ColumnCipherSet {
    provider: Arc<dyn EncryptionProvider>,
    columns: HashMap<String, Vec<String>>,
}

impl ColumnCipherSet {
    /// A set with no bound columns; rows pass through unchanged.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            provider: Arc::new(crate::provider::PassthroughProvider),
            columns: HashMap::new(),
        }
    }

    /// Whether a converter is bound for this (entity type, column) pair.
    #[must_use]
    pub fn is_bound(&self, entity_type: &str, column: &str) -> bool {
        self.columns
            .get(entity_type)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }

    /// Number of bound columns across all entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Encrypts the bound columns of a row in place.
    pub fn encrypt_row(
        &self,
        entity_type: &str,
        row: &mut serde_json::Value,
    ) -> CryptoResult<()> {
        self.transform_row(entity_type, row, |provider, s| provider.encrypt(s))
    }

    /// Decrypts the bound columns of a row in place.
    pub fn decrypt_row(
        &self,
        entity_type: &str,
        row: &mut serde_json::Value,
    ) -> CryptoResult<()> {
        self.transform_row(entity_type, row, |provider, s| provider.decrypt(s))
    }

    fn transform_row(
        &self,
        entity_type: &str,
        row: &mut serde_json::Value,
        apply: impl Fn(&dyn EncryptionProvider, &str) -> CryptoResult<String>,
    ) -> CryptoResult<()> {
        let Some(bound) = self.columns.get(entity_type) else {
            return Ok(());
        };
        let Some(fields) = row.as_object_mut() else {
            return Ok(());
        };
        for column in bound {
            if let Some(value) = fields.get_mut(column) {
                if let serde_json::Value::String(s) = value {
                    let transformed = apply(self.provider.as_ref(), s)?;
                    *value = serde_json::Value::String(transformed);
                }
            }
        }
        Ok(())
    }
}

/// Builds the column cipher set from schema `encrypted` flags.
///
/// Only text columns that are neither primary key nor discriminator are
/// bound; a marker on any other column is skipped. Runs once at startup.
#[must_use]
pub fn bind_encryption(
    registry: &SchemaRegistry,
    provider: Arc<dyn EncryptionProvider>,
) -> ColumnCipherSet {
    let mut columns: HashMap<String, Vec<String>> = HashMap::new();
    for schema in registry.iter() {
        for col in &schema.columns {
            if !col.encrypted {
                continue;
            }
            if col.kind != ColumnKind::Text || col.discriminator || col.primary_key {
                continue;
            }
            columns
                .entry(schema.entity_type.clone())
                .or_default()
                .push(col.name.clone());
        }
    }
    ColumnCipherSet { provider, columns }
}
