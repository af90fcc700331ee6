use serde::{Deserialize, Serialize};

/// Describes an entity type's storage shape: columns, flags and relations.
///
/// Built once at startup and registered in a [`crate::SchemaRegistry`];
/// engines derive DDL and column extraction from it, and the encryption
/// binding pass derives its column map from the `encrypted` flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    pub columns: Vec<ColumnDef>,
    pub relations: Vec<RelationDef>,
}

impl EntitySchema {
    /// Starts a schema for the given entity type.
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, def: ColumnDef) -> Self {
        self.columns.push(def);
        self
    }

    /// Declares a named relation to another entity type, usable as an
    /// eager-load include.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key columns, in declaration order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Whether the schema declares a relation with this name.
    #[must_use]
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.iter().any(|r| r.name == name)
    }
}

/// A single storage column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub primary_key: bool,
    pub discriminator: bool,
    pub encrypted: bool,
}

impl ColumnDef {
    fn simple(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            discriminator: false,
            encrypted: false,
        }
    }

    /// Shorthand for a text column.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Text)
    }

    /// Shorthand for an integer column.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Integer)
    }

    /// Shorthand for a real column.
    #[must_use]
    pub fn real(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Real)
    }

    /// Shorthand for a boolean column.
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Bool)
    }

    /// Shorthand for a byte-blob column.
    #[must_use]
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Bytes)
    }

    /// Shorthand for a UTC timestamp column.
    #[must_use]
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::simple(name, ColumnKind::Timestamp)
    }

    /// Marks this column as (part of) the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks this column as the type discriminator for single-table
    /// sub-typing. Discriminators are never encrypted.
    #[must_use]
    pub const fn discriminator(mut self) -> Self {
        self.discriminator = true;
        self
    }

    /// Marks this column for transparent encryption at the storage
    /// boundary. Only honored on text columns that are neither key nor
    /// discriminator; the binding pass skips anything else.
    #[must_use]
    pub const fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }
}

/// The storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Bool,
    Bytes,
    /// UTC timestamp, stored in RFC 3339 text form.
    Timestamp,
}

/// A named relation to another entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub target: String,
}
