//! The change-state machine.
//!
//! A [`ChangeContext`] is the call-scoped set of staged entity transitions
//! owned by one logical unit of work. Centralizing attach-before-mutate
//! here prevents the classic mistake of mutating a detached copy that
//! silently never persists.

use crate::error::{RepoError, RepoResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use veil_model::{to_row, Entity};
use veil_types::Value;

/// Lifecycle of an entity instance relative to the context.
///
/// `Detached` entities are unknown to the context; all other states are
/// tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    Unchanged,
    Added,
    Modified,
    Deleted,
    Detached,
}

/// One staged transition handed to the engine at save time.
#[derive(Debug, Clone)]
pub struct StagedOp {
    pub entity_type: &'static str,
    pub state: ChangeState,
    pub key: Value,
    /// The serialized row; `None` for deletions.
    pub row: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    entity_type: &'static str,
    key: String,
}

#[derive(Debug, Clone)]
struct Entry {
    state: ChangeState,
    key: Value,
    row: Option<serde_json::Value>,
}

/// The set of tracked entities and their staged transitions.
///
/// Identity is `(entity type, Display rendering of the key)`; composite
/// keys supply a stable `Display`. Entries keep their first-insertion
/// order, so engines see staged operations in the order they were staged.
#[derive(Debug, Default)]
pub struct ChangeContext {
    entries: HashMap<EntryKey, Entry>,
    order: Vec<EntryKey>,
}

impl ChangeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_key<E: Entity>(entity: &E) -> EntryKey {
        EntryKey {
            entity_type: E::NAME,
            key: entity.key().to_string(),
        }
    }

    fn insert(&mut self, key: EntryKey, entry: Entry) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, entry);
    }

    /// The context's view of an entity instance.
    #[must_use]
    pub fn state_of<E: Entity>(&self, entity: &E) -> ChangeState {
        self.entries
            .get(&Self::entry_key(entity))
            .map_or(ChangeState::Detached, |e| e.state)
    }

    /// Stages an insertion.
    ///
    /// A detached entity transitions to `Added`; an entity already known
    /// to the context keeps its current state. For [`veil_model::Modifiable`]
    /// entities the creation timestamp is set to the current UTC time only
    /// when unset; a caller-supplied value (migrated data) is preserved.
    pub fn create<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()> {
        stamp_created(entity);
        if self.state_of(entity) != ChangeState::Detached {
            return Ok(());
        }
        let row = to_row(entity)?;
        self.insert(
            Self::entry_key(entity),
            Entry {
                state: ChangeState::Added,
                key: entity.key().into(),
                row: Some(row),
            },
        );
        Ok(())
    }

    /// Stages an insertion for every member of the batch, atomically from
    /// the caller's point of view.
    ///
    /// Every row is stamped, serialized and checked before any entry is
    /// inserted; duplicate keys within the batch (or a serialization
    /// failure) stage nothing. Members already known to the context keep
    /// their current state, matching [`ChangeContext::create`].
    pub fn create_range<E: Entity>(&mut self, entities: &mut [E]) -> RepoResult<()> {
        let mut planned: Vec<(EntryKey, Entry)> = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            stamp_created(entity);
            let key = Self::entry_key(entity);
            if planned.iter().any(|(k, _)| *k == key) {
                return Err(RepoError::InvalidArgument(format!(
                    "duplicate {} key {} in batch",
                    E::NAME,
                    key.key
                )));
            }
            if self.entries.contains_key(&key) {
                continue;
            }
            let row = to_row(entity)?;
            planned.push((
                key,
                Entry {
                    state: ChangeState::Added,
                    key: entity.key().into(),
                    row: Some(row),
                },
            ));
        }
        for (key, entry) in planned {
            self.insert(key, entry);
        }
        Ok(())
    }

    /// Stages a modification.
    ///
    /// The modification timestamp is bumped unconditionally: an explicit
    /// update always triggers a write, even when the context sees no field
    /// changes. A detached entity is attached first; a tracked one is
    /// forced to `Modified` regardless of prior state. The one exception
    /// is `Added`: the entity has never been persisted, so the pending
    /// insertion absorbs the new row instead of becoming an update of a
    /// row that does not exist.
    pub fn update<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()> {
        if let Some(m) = entity.as_modifiable() {
            m.set_modified_at(Utc::now());
        }
        let row = to_row(entity)?;
        let key = Self::entry_key(entity);
        let state = if self
            .entries
            .get(&key)
            .is_some_and(|e| e.state == ChangeState::Added)
        {
            ChangeState::Added
        } else {
            ChangeState::Modified
        };
        self.insert(
            key,
            Entry {
                state,
                key: entity.key().into(),
                row: Some(row),
            },
        );
        Ok(())
    }

    /// Stages a removal, attaching the entity first when detached.
    ///
    /// An entity staged `Added` has never been persisted, so deleting it
    /// simply un-stages the insertion.
    pub fn delete<E: Entity>(&mut self, entity: &E) {
        let key = Self::entry_key(entity);
        if self
            .entries
            .get(&key)
            .is_some_and(|e| e.state == ChangeState::Added)
        {
            self.entries.remove(&key);
            self.order.retain(|k| *k != key);
            return;
        }
        self.insert(
            key,
            Entry {
                state: ChangeState::Deleted,
                key: entity.key().into(),
                row: None,
            },
        );
    }

    /// Registers a materialized entity as `Unchanged`.
    ///
    /// Used by tracked reads. An entity already known to the context keeps
    /// its current state; materialization never downgrades a staged
    /// transition.
    pub fn register_unchanged<E: Entity>(&mut self, entity: &E) -> RepoResult<()> {
        let key = Self::entry_key(entity);
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        let row = to_row(entity)?;
        self.insert(
            key,
            Entry {
                state: ChangeState::Unchanged,
                key: entity.key().into(),
                row: Some(row),
            },
        );
        Ok(())
    }

    /// Snapshot of the staged transitions (`Added`/`Modified`/`Deleted`),
    /// in staging order.
    #[must_use]
    pub fn staged(&self) -> Vec<StagedOp> {
        self.order
            .iter()
            .filter_map(|key| {
                let entry = &self.entries[key];
                match entry.state {
                    ChangeState::Added | ChangeState::Modified | ChangeState::Deleted => {
                        Some(StagedOp {
                            entity_type: key.entity_type,
                            state: entry.state,
                            key: entry.key.clone(),
                            row: entry.row.clone(),
                        })
                    }
                    ChangeState::Unchanged | ChangeState::Detached => None,
                }
            })
            .collect()
    }

    /// Forgets every tracked entity. Called after a successful save so the
    /// next logical operation starts from a clean slate.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of tracked entities (any non-detached state).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn stamp_created<E: Entity>(entity: &mut E) {
    if let Some(m) = entity.as_modifiable() {
        if m.created_at().is_none() {
            m.set_created_at(Utc::now());
        }
    }
}
