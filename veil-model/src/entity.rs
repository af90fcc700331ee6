//! The contract a persisted record type implements.

use crate::{ModelError, ModelResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use veil_types::Value;

/// A typed, identity-bearing record persisted by the layer.
///
/// Implementations are plain serde-able structs; the layer never requires
/// hand-written query code per entity type. `NAME` doubles as the storage
/// table name and must be unique across the registry.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The entity type / table name.
    const NAME: &'static str;

    /// The identity type. Composite keys are newtypes with a stable
    /// `Display` rendering.
    type Key: Clone + Eq + Hash + fmt::Display + Into<Value> + Send + Sync + 'static;

    /// Returns this instance's identity.
    fn key(&self) -> Self::Key;

    /// Capability probe for timestamp bookkeeping.
    ///
    /// Types that carry creation/modification timestamps return
    /// `Some(self)`; the write path then maintains them.
    fn as_modifiable(&mut self) -> Option<&mut dyn Modifiable> {
        None
    }
}

/// Capability for entities whose lifecycle timestamps are maintained by the
/// write path.
///
/// `created_at` is set exactly once (a pre-populated value, e.g. from
/// migrated data, is never overwritten); `modified_at` is bumped on every
/// update.
pub trait Modifiable {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn set_created_at(&mut self, at: DateTime<Utc>);
    fn modified_at(&self) -> Option<DateTime<Utc>>;
    fn set_modified_at(&mut self, at: DateTime<Utc>);
}

/// Serializes an entity into its flat JSON row.
pub fn to_row<E: Entity>(entity: &E) -> ModelResult<serde_json::Value> {
    let row = serde_json::to_value(entity)?;
    if !row.is_object() {
        return Err(ModelError::NotAnObject(E::NAME.to_string()));
    }
    Ok(row)
}

/// Materializes an entity from a flat JSON row.
pub fn from_row<E: Entity>(row: serde_json::Value) -> ModelResult<E> {
    Ok(serde_json::from_value(row)?)
}
