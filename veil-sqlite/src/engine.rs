//! The rusqlite-backed execution engine.

use crate::config::SqliteOptions;
use crate::sql::{
    constraint_field, create_table_sql, filter_sql, json_to_sql, order_sql, quote_ident,
    sql_to_json, to_sql_value, window_sql,
};
use rusqlite::{params_from_iter, Connection, ErrorCode, Row, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use veil_crypto::ColumnCipherSet;
use veil_model::{from_row, Entity, EntitySchema, SchemaRegistry};
use veil_query::{AbstractQuery, Filter};
use veil_repo::{
    ChangeState, CommandEvent, CommandInterceptor, EngineError, EngineResult, ExecutionEngine,
    FieldError, SaveReport, StagedOp,
};
use veil_types::Value;

type Validator = Box<dyn Fn(&serde_json::Value) -> Vec<FieldError> + Send + Sync>;

/// An [`ExecutionEngine`] over a single SQLite connection.
///
/// The connection is serialized behind a mutex. Saves run in one
/// transaction; any failure rolls the whole change-set back. Registered
/// interceptors fire around every executed statement.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    registry: Arc<SchemaRegistry>,
    ciphers: ColumnCipherSet,
    validators: HashMap<String, Validator>,
    interceptors: Vec<Arc<dyn CommandInterceptor>>,
}

impl SqliteEngine {
    /// Opens the database without column encryption.
    pub fn open(options: &SqliteOptions, registry: Arc<SchemaRegistry>) -> EngineResult<Self> {
        Self::open_with_encryption(options, registry, ColumnCipherSet::empty())
    }

    /// Opens the database, applying the cipher set at the row boundary.
    ///
    /// Bootstrap configures WAL journaling, foreign keys and the busy
    /// timeout, then creates any missing tables from the registry.
    pub fn open_with_encryption(
        options: &SqliteOptions,
        registry: Arc<SchemaRegistry>,
        ciphers: ColumnCipherSet,
    ) -> EngineResult<Self> {
        let started = Instant::now();
        let conn = match &options.path {
            Some(path) => {
                if options.create_dirs {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            EngineError::Backend(format!(
                                "cannot create {}: {e}",
                                parent.display()
                            ))
                        })?;
                    }
                }
                Connection::open(path).map_err(open_error)?
            }
            None => Connection::open_in_memory().map_err(open_error)?,
        };

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(open_error)?;
        conn.busy_timeout(options.busy_timeout()).map_err(open_error)?;

        for schema in registry.iter() {
            conn.execute_batch(&create_table_sql(schema)).map_err(open_error)?;
        }

        info!(
            mode = if options.path.is_some() { "file" } else { "memory" },
            schemas = registry.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "sqlite engine opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            registry,
            ciphers,
            validators: HashMap::new(),
            interceptors: Vec::new(),
        })
    }

    /// Registers a validation hook for an entity type, run against each
    /// staged plaintext row before the save transaction starts.
    pub fn set_validator(
        &mut self,
        entity_type: impl Into<String>,
        validator: impl Fn(&serde_json::Value) -> Vec<FieldError> + Send + Sync + 'static,
    ) {
        self.validators.insert(entity_type.into(), Box::new(validator));
    }

    /// Adds a before/after hook invoked around every executed statement.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn CommandInterceptor>) {
        self.interceptors.push(interceptor);
    }

    fn lock_conn(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EngineError::Backend(format!("connection lock poisoned: {e}")))
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

    /// Runs one statement with interceptor hooks and timing around it.
    fn observe<T>(
        &self,
        sql: &str,
        params: &[Value],
        run: impl FnOnce() -> rusqlite::Result<T>,
    ) -> EngineResult<T> {
        let event = CommandEvent {
            statement: sql,
            params,
        };
        for interceptor in &self.interceptors {
            interceptor.before(&event);
        }
        let started = Instant::now();
        let result = run();
        let elapsed = started.elapsed();
        for interceptor in &self.interceptors {
            interceptor.after(&event, elapsed);
        }
        debug!(
            sql,
            elapsed_us = elapsed.as_micros() as u64,
            ok = result.is_ok(),
            "statement executed"
        );
        result.map_err(statement_error)
    }

    fn fetch_rows(
        &self,
        schema: &EntitySchema,
        sql: &str,
        params: &[Value],
    ) -> EngineResult<Vec<serde_json::Value>> {
        let conn = self.lock_conn()?;
        self.observe(sql, params, || {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(schema_row_to_json(schema, row)?);
            }
            Ok(out)
        })
    }

    fn materialize<E: Entity>(&self, mut row: serde_json::Value) -> EngineResult<E> {
        self.ciphers.decrypt_row(E::NAME, &mut row)?;
        Ok(from_row(row)?)
    }

    fn apply_op(&self, tx: &Transaction<'_>, op: &StagedOp) -> EngineResult<u64> {
        let schema = self.schema(op.entity_type)?;
        let table = quote_ident(&schema.entity_type);
        match op.state {
            ChangeState::Added => {
                let row = self.encrypted_row(op)?;
                let columns: Vec<String> = schema
                    .columns
                    .iter()
                    .map(|c| quote_ident(&c.name))
                    .collect();
                let placeholders: Vec<&str> = schema.columns.iter().map(|_| "?").collect();
                let sql = format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders.join(", ")
                );
                let values = row_params(schema, &row)?;
                self.execute_in_tx(tx, &sql, values).map(|n| n as u64)
            }
            ChangeState::Modified => {
                let row = self.encrypted_row(op)?;
                let pk = self.primary_key_column(op.entity_type)?;
                let assignments: Vec<String> = schema
                    .columns
                    .iter()
                    .filter(|c| !c.primary_key)
                    .map(|c| format!("{} = ?", quote_ident(&c.name)))
                    .collect();
                let sql = format!(
                    "UPDATE {table} SET {} WHERE {} = ?",
                    assignments.join(", "),
                    quote_ident(&pk)
                );
                let mut values: Vec<rusqlite::types::Value> = Vec::new();
                for col in schema.columns.iter().filter(|c| !c.primary_key) {
                    let field = row.get(&col.name).unwrap_or(&serde_json::Value::Null);
                    values.push(json_to_sql(&schema.entity_type, &col.name, col.kind, field)?);
                }
                values.push(to_sql_value(&op.key));
                let affected = self.execute_in_tx(tx, &sql, values)?;
                if affected == 0 {
                    return Err(EngineError::Backend(format!(
                        "update of missing {} row {}",
                        op.entity_type, op.key
                    )));
                }
                Ok(affected as u64)
            }
            ChangeState::Deleted => {
                let pk = self.primary_key_column(op.entity_type)?;
                let sql = format!("DELETE FROM {table} WHERE {} = ?", quote_ident(&pk));
                let values = vec![to_sql_value(&op.key)];
                let affected = self.execute_in_tx(tx, &sql, values)?;
                if affected == 0 {
                    return Err(EngineError::Backend(format!(
                        "delete of missing {} row {}",
                        op.entity_type, op.key
                    )));
                }
                Ok(affected as u64)
            }
            ChangeState::Unchanged | ChangeState::Detached => Ok(0),
        }
    }

    fn encrypted_row(&self, op: &StagedOp) -> EngineResult<serde_json::Value> {
        let mut row = op
            .row
            .clone()
            .ok_or_else(|| EngineError::Backend("write without a row".to_string()))?;
        self.ciphers.encrypt_row(op.entity_type, &mut row)?;
        Ok(row)
    }

    fn execute_in_tx(
        &self,
        tx: &Transaction<'_>,
        sql: &str,
        values: Vec<rusqlite::types::Value>,
    ) -> EngineResult<usize> {
        // Interceptors see the logical parameter set, not driver values.
        let params: Vec<Value> = values.iter().map(sql_value_to_value).collect();
        let event = CommandEvent {
            statement: sql,
            params: &params,
        };
        for interceptor in &self.interceptors {
            interceptor.before(&event);
        }
        let started = Instant::now();
        let result = tx.execute(sql, params_from_iter(values));
        let elapsed = started.elapsed();
        for interceptor in &self.interceptors {
            interceptor.after(&event, elapsed);
        }
        debug!(
            sql,
            elapsed_us = elapsed.as_micros() as u64,
            ok = result.is_ok(),
            "statement executed"
        );
        result.map_err(statement_error)
    }
}

impl ExecutionEngine for SqliteEngine {
    fn fetch<E: Entity>(&self, query: &AbstractQuery) -> EngineResult<Vec<E>> {
        let schema = self.schema(query.entity_type)?;
        if !query.includes.is_empty() {
            debug!(
                entity_type = query.entity_type,
                includes = query.includes.len(),
                "eager-load hints accepted and ignored"
            );
        }

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}",
            select_list(schema),
            quote_ident(&schema.entity_type)
        );
        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter_sql(filter, &mut params));
        }
        if let Some(order) = &query.order {
            sql.push_str(&order_sql(order));
        }
        sql.push_str(&window_sql(query.skip, query.take));

        let rows = self.fetch_rows(schema, &sql, &params)?;
        rows.into_iter().map(|row| self.materialize(row)).collect()
    }

    fn fetch_by_key<E: Entity>(&self, key: &Value) -> EngineResult<Option<E>> {
        let schema = self.schema(E::NAME)?;
        let pk = self.primary_key_column(E::NAME)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
            select_list(schema),
            quote_ident(&schema.entity_type),
            quote_ident(&pk)
        );
        let mut rows = self.fetch_rows(schema, &sql, std::slice::from_ref(key))?;
        match rows.pop() {
            Some(row) => Ok(Some(self.materialize(row)?)),
            None => Ok(None),
        }
    }

    fn count(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<u64> {
        let schema = self.schema(entity_type)?;
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&schema.entity_type));
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter_sql(filter, &mut params));
        }
        let conn = self.lock_conn()?;
        self.observe(&sql, &params, || {
            conn.query_row(
                &sql,
                params_from_iter(params.iter().map(to_sql_value)),
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
        })
    }

    fn exists(&self, entity_type: &str, filter: Option<&Filter>) -> EngineResult<bool> {
        let schema = self.schema(entity_type)?;
        let mut params = Vec::new();
        let mut inner = format!("SELECT 1 FROM {}", quote_ident(&schema.entity_type));
        if let Some(filter) = filter {
            inner.push_str(" WHERE ");
            inner.push_str(&filter_sql(filter, &mut params));
        }
        let sql = format!("SELECT EXISTS({inner})");
        let conn = self.lock_conn()?;
        self.observe(&sql, &params, || {
            conn.query_row(
                &sql,
                params_from_iter(params.iter().map(to_sql_value)),
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n != 0)
        })
    }

    fn fetch_raw<E: Entity>(&self, sql: &str, params: &[Value]) -> EngineResult<Vec<E>> {
        let schema = self.schema(E::NAME)?;
        let conn = self.lock_conn()?;
        let rows = self.observe(sql, params, || {
            let mut stmt = conn.prepare(sql)?;
            let names: Vec<String> =
                stmt.column_names().iter().map(|n| n.to_string()).collect();
            let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut object = serde_json::Map::new();
                for (idx, name) in names.iter().enumerate() {
                    let kind = schema.find_column(name).map(|c| c.kind);
                    object.insert(name.clone(), sql_to_json(kind, row.get_ref(idx)?));
                }
                out.push(serde_json::Value::Object(object));
            }
            Ok(out)
        })?;
        drop(conn);
        rows.into_iter().map(|row| self.materialize(row)).collect()
    }

    fn execute_sql(&self, sql: &str, params: &[Value]) -> EngineResult<u64> {
        let conn = self.lock_conn()?;
        self.observe(sql, params, || {
            conn.execute(sql, params_from_iter(params.iter().map(to_sql_value)))
                .map(|n| n as u64)
        })
    }

    fn save(&self, ops: &[StagedOp]) -> EngineResult<SaveReport> {
        // Validation first, against plaintext rows, reporting every
        // failure together before any statement runs.
        let mut errors = Vec::new();
        for op in ops {
            if let (Some(row), Some(validator)) = (&op.row, self.validators.get(op.entity_type)) {
                errors.extend(validator(row));
            }
        }
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| EngineError::Backend(format!("cannot begin transaction: {e}")))?;

        let mut rows_affected = 0u64;
        for op in ops {
            rows_affected += self.apply_op(&tx, op)?;
        }

        tx.commit()
            .map_err(|e| EngineError::Backend(format!("commit failed: {e}")))?;
        Ok(SaveReport { rows_affected })
    }

    fn set_command_timeout(&self, timeout: Duration) {
        match self.lock_conn() {
            Ok(conn) => {
                if let Err(e) = conn.busy_timeout(timeout) {
                    warn!("cannot set busy timeout: {e}");
                }
            }
            Err(e) => warn!("cannot set busy timeout: {e}"),
        }
    }
}

fn select_list(schema: &EntitySchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn schema_row_to_json(
    schema: &EntitySchema,
    row: &Row<'_>,
) -> rusqlite::Result<serde_json::Value> {
    let mut object = serde_json::Map::new();
    for (idx, col) in schema.columns.iter().enumerate() {
        object.insert(col.name.clone(), sql_to_json(Some(col.kind), row.get_ref(idx)?));
    }
    Ok(serde_json::Value::Object(object))
}

fn row_params(
    schema: &EntitySchema,
    row: &serde_json::Value,
) -> EngineResult<Vec<rusqlite::types::Value>> {
    schema
        .columns
        .iter()
        .map(|col| {
            let field = row.get(&col.name).unwrap_or(&serde_json::Value::Null);
            json_to_sql(&schema.entity_type, &col.name, col.kind, field)
        })
        .collect()
}

fn sql_value_to_value(value: &rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null => Value::Null,
        rusqlite::types::Value::Integer(n) => Value::Integer(*n),
        rusqlite::types::Value::Real(r) => Value::Real(*r),
        rusqlite::types::Value::Text(s) => Value::Text(s.clone()),
        rusqlite::types::Value::Blob(b) => Value::Bytes(b.clone()),
    }
}

fn open_error(e: rusqlite::Error) -> EngineError {
    EngineError::Backend(format!("cannot open database: {e}"))
}

/// Maps a statement failure; constraint violations become field-level
/// validation errors so the save path reports them like any other
/// validation failure.
fn statement_error(e: rusqlite::Error) -> EngineError {
    if let rusqlite::Error::SqliteFailure(inner, Some(message)) = &e {
        if inner.code == ErrorCode::ConstraintViolation {
            return EngineError::Validation(vec![FieldError::new(
                constraint_field(message),
                message.clone(),
            )]);
        }
    }
    EngineError::Backend(e.to_string())
}
