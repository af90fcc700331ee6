//! Shared fixtures for the repository test suites.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use veil_model::{ColumnDef, Entity, EntitySchema, Modifiable, SchemaRegistry};
use veil_repo::{MemoryEngine, Repository};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub ssn: String,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Entity for Person {
    const NAME: &'static str = "people";
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn as_modifiable(&mut self) -> Option<&mut dyn Modifiable> {
        Some(self)
    }
}

impl Modifiable for Person {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }
    fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }
    fn set_modified_at(&mut self, at: DateTime<Utc>) {
        self.modified_at = Some(at);
    }
}

pub fn person(id: i64, name: &str, age: i64) -> Person {
    Person {
        id,
        name: name.to_string(),
        age,
        ssn: format!("{id:03}-00-0000"),
        created_at: None,
        modified_at: None,
    }
}

pub fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            EntitySchema::new("people")
                .column(ColumnDef::integer("id").primary_key())
                .column(ColumnDef::text("name"))
                .column(ColumnDef::integer("age"))
                .column(ColumnDef::text("ssn").encrypted())
                .column(ColumnDef::timestamp("created_at"))
                .column(ColumnDef::timestamp("modified_at")),
        )
        .unwrap();
    Arc::new(registry)
}

pub fn repository() -> Repository<MemoryEngine> {
    let registry = registry();
    Repository::new(MemoryEngine::new(registry.clone()), registry)
}
