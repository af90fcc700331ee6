use crate::{EntitySchema, ModelError, ModelResult};
use std::collections::HashMap;

/// The startup-built table of known entity types.
///
/// Registration is the only mutation; afterwards the registry is shared
/// read-only by the query composer, the encryption binding pass and the
/// engines. Composing a query over a type that was never registered is a
/// programmer error surfaced as `UnknownEntityType` downstream.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema.
    ///
    /// Rejects duplicate entity types, duplicate column names and schemas
    /// without a primary key.
    pub fn register(&mut self, schema: EntitySchema) -> ModelResult<()> {
        if self.schemas.contains_key(&schema.entity_type) {
            return Err(ModelError::DuplicateEntityType(schema.entity_type));
        }
        if schema.primary_key_columns().is_empty() {
            return Err(ModelError::MissingPrimaryKey(schema.entity_type));
        }
        for (i, col) in schema.columns.iter().enumerate() {
            if schema.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(ModelError::DuplicateColumn {
                    entity: schema.entity_type.clone(),
                    column: col.name.clone(),
                });
            }
        }
        self.schemas.insert(schema.entity_type.clone(), schema);
        Ok(())
    }

    /// Looks up the schema for an entity type.
    #[must_use]
    pub fn get(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    /// Whether the entity type is registered.
    #[must_use]
    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    /// Iterates over all registered schemas in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
