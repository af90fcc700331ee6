//! In-memory reference engine.
//!
//! Tables are vectors of serialized rows, stored exactly as a relational
//! engine would persist them: encrypted columns hold ciphertext, and
//! filters and aggregates run against the stored form. Used by the test suites and
//! by embedders that want repository semantics without a database file.

use crate::context::{ChangeState, StagedOp};
use crate::engine::{EngineError, EngineResult, ExecutionEngine, FieldError, SaveReport};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use veil_crypto::ColumnCipherSet;
use veil_model::{from_row, Entity, EntitySchema, SchemaRegistry};
use veil_query::{AbstractQuery, Direction, Filter, Order};
use veil_types::Value;

type Validator = Box<dyn Fn(&serde_json::Value) -> Vec<FieldError> + Send + Sync>;
type Tables = HashMap<String, Vec<serde_json::Value>>;

/// An [`ExecutionEngine`] holding every table in process memory.
pub struct MemoryEngine {
    registry: Arc<SchemaRegistry>,
    ciphers: ColumnCipherSet,
    tables: Mutex<Tables>,
    validators: HashMap<String, Validator>,
    command_timeout: Mutex<Duration>,
}

impl MemoryEngine {
    /// An engine without column encryption.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_encryption(registry, ColumnCipherSet::empty())
    }

    /// An engine applying the given column cipher set at the row boundary.
    #[must_use]
    pub fn with_encryption(registry: Arc<SchemaRegistry>, ciphers: ColumnCipherSet) -> Self {
        Self {
            registry,
            ciphers,
            tables: Mutex::new(HashMap::new()),
            validators: HashMap::new(),
            command_timeout: Mutex::new(Duration::from_secs(30)),
        }
    }

    /// Registers a validation hook for an entity type, run against each
    /// staged plaintext row inside `save`. Returning any field error
    /// rejects the whole change-set.
    pub fn set_validator(
        &mut self,
        entity_type: impl Into<String>,
        validator: impl Fn(&serde_json::Value) -> Vec<FieldError> + Send + Sync + 'static,
    ) {
        self.validators.insert(entity_type.into(), Box::new(validator));
    }

    /// The rows of a table as stored, ciphertext included. Intended for
    /// inspection in tests and diagnostics.
    #[must_use]
    pub fn stored_rows(&self, entity_type: &str) -> Vec<serde_json::Value> {
        self.lock_tables().map_or_else(
            |_| Vec::new(),
            |tables| tables.get(entity_type).cloned().unwrap_or_default(),
        )
    }

    fn lock_tables(&self) -> EngineResult<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| EngineError::Backend(format!("engine lock poisoned: {e}")))
    }

    fn schema(&self, entity_type: &str) -> EngineResult<&EntitySchema> {
        self.registry
            .get(entity_type)
            .ok_or_else(|| EngineError::Backend(format!("no schema for {entity_type}")))
    }

    fn primary_key_column(&self, entity_type: &str) -> EngineResult<String> {
        let schema = self.schema(entity_type)?;
        let pk = schema.primary_key_columns();
        match pk.as_slice() {
            [single] => Ok(single.name.clone()),
            _ => Err(EngineError::Backend(format!(
                "{entity_type} has a composite key; key lookup needs a single-column key"
            ))),
        }
    }

    fn materialize<E: Entity>(&self, stored: &serde_json::Value) -> EngineResult<E> {
        let mut row = stored.clone();
        self.ciphers.decrypt_row(E::NAME, &mut row)?;
        Ok(from_row(row)?)
    }
}

impl ExecutionEngine for MemoryEngine {
    fn fetch<E: Entity>(&self, query: &AbstractQuery) -> EngineResult<Vec<E>> {
        let tables = self.lock_tables()?;
        let rows = tables.get(query.entity_type).map_or(&[][..], Vec::as_slice);

        let mut matched: Vec<&serde_json::Value> = rows
            .iter()
            .filter(|row| filter_matches(query.filter.as_ref(), row))
            .collect();

        if let Some(order) = &query.order {
            sort_rows(&mut matched, order);
        }

        let skip = query.skip.unwrap_or(0) as usize;
        let take = query.take.map_or(usize::MAX, |t| t as usize);
        matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| self.materialize(row))
            .collect()
    }

    fn fetch_by_key<E: Entity>(&self, key: &Value) -> EngineResult<Option<E>> {
        let pk = self.primary_key_column(E::NAME)?;
        let tables = self.lock_tables()?;
        let Some(rows) = tables.get(E::NAME) else {
            return Ok(None);
        };
        match rows.iter().find(|row| row_key_matches(row, &pk, key)) {
            Some(row) => Ok(Some(self.materialize(row)?)),
            None => Ok(None),
        }
    }

    fn count(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<u64> {
        let tables = self.lock_tables()?;
        let rows = tables.get(entity_type).map_or(&[][..], Vec::as_slice);
        Ok(rows
            .iter()
            .filter(|row| filter_matches(filter, row))
            .count() as u64)
    }

    fn exists(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<bool> {
        let tables = self.lock_tables()?;
        let rows = tables.get(entity_type).map_or(&[][..], Vec::as_slice);
        Ok(rows.iter().any(|row| filter_matches(filter, row)))
    }

    fn fetch_raw<E: Entity>(&self, _sql: &str, _params: &[Value]) -> EngineResult<Vec<E>> {
        Err(EngineError::Backend(
            "the in-memory engine does not execute SQL".to_string(),
        ))
    }

    fn execute_sql(&self, _sql: &str, _params: &[Value]) -> EngineResult<u64> {
        Err(EngineError::Backend(
            "the in-memory engine does not execute SQL".to_string(),
        ))
    }

    fn save(&self, ops: &[StagedOp]) -> EngineResult<SaveReport> {
        // Validation first: every staged row is checked and every failure
        // reported together, before anything is touched.
        let mut errors = Vec::new();
        for op in ops {
            if let (Some(row), Some(validator)) = (&op.row, self.validators.get(op.entity_type)) {
                errors.extend(validator(row));
            }
        }
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let mut tables = self.lock_tables()?;
        // Apply against a copy; the stored state only changes if the whole
        // change-set goes through.
        let mut staged: Tables = tables.clone();
        let mut rows_affected = 0u64;

        for op in ops {
            let pk = self.primary_key_column(op.entity_type)?;
            let table = staged.entry(op.entity_type.to_string()).or_default();
            match op.state {
                ChangeState::Added => {
                    if table.iter().any(|row| row_key_matches(row, &pk, &op.key)) {
                        return Err(EngineError::Validation(vec![FieldError::new(
                            pk,
                            format!("duplicate key {} for {}", op.key, op.entity_type),
                        )]));
                    }
                    let mut row = op
                        .row
                        .clone()
                        .ok_or_else(|| EngineError::Backend("insert without a row".into()))?;
                    self.ciphers.encrypt_row(op.entity_type, &mut row)?;
                    table.push(row);
                }
                ChangeState::Modified => {
                    let index = table
                        .iter()
                        .position(|row| row_key_matches(row, &pk, &op.key))
                        .ok_or_else(|| {
                            EngineError::Backend(format!(
                                "update of missing {} row {}",
                                op.entity_type, op.key
                            ))
                        })?;
                    let mut row = op
                        .row
                        .clone()
                        .ok_or_else(|| EngineError::Backend("update without a row".into()))?;
                    self.ciphers.encrypt_row(op.entity_type, &mut row)?;
                    table[index] = row;
                }
                ChangeState::Deleted => {
                    let index = table
                        .iter()
                        .position(|row| row_key_matches(row, &pk, &op.key))
                        .ok_or_else(|| {
                            EngineError::Backend(format!(
                                "delete of missing {} row {}",
                                op.entity_type, op.key
                            ))
                        })?;
                    table.remove(index);
                }
                ChangeState::Unchanged | ChangeState::Detached => continue,
            }
            rows_affected += 1;
        }

        *tables = staged;
        Ok(SaveReport { rows_affected })
    }

    fn set_command_timeout(&self, timeout: Duration) {
        if let Ok(mut current) = self.command_timeout.lock() {
            *current = timeout;
        }
    }
}

fn filter_matches(filter: Option<&Filter>, row: &serde_json::Value) -> bool {
    filter.is_none_or(|f| f.matches_row(row))
}

fn row_key_matches(row: &serde_json::Value, pk: &str, key: &Value) -> bool {
    row.get(pk)
        .and_then(Value::from_json)
        .is_some_and(|v| v.compare(key) == Some(Ordering::Equal))
}

fn sort_rows(rows: &mut [&serde_json::Value], order: &Order) {
    rows.sort_by(|a, b| {
        let left = a.get(&order.column).and_then(Value::from_json);
        let right = b.get(&order.column).and_then(Value::from_json);
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => l.compare(&r).unwrap_or(Ordering::Equal),
        };
        match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });
}
