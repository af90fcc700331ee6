//! SQL assembly and value mapping.
//!
//! Statement text is built from schema metadata and the filter AST only;
//! every caller-supplied operand travels as a bound parameter.

use rusqlite::types::{Value as SqlValue, ValueRef};
use veil_model::{ColumnKind, EntitySchema};
use veil_query::{CmpOp, Direction, Filter, Order};
use veil_repo::EngineError;
use veil_types::Value;

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// CREATE TABLE statement for a schema.
pub(crate) fn create_table_sql(schema: &EntitySchema) -> String {
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            let ty = match col.kind {
                ColumnKind::Text | ColumnKind::Timestamp => "TEXT",
                ColumnKind::Integer | ColumnKind::Bool => "INTEGER",
                ColumnKind::Real => "REAL",
                ColumnKind::Bytes => "BLOB",
            };
            let null = if col.primary_key { " NOT NULL" } else { "" };
            format!("{} {ty}{null}", quote_ident(&col.name))
        })
        .collect();

    let pk: Vec<String> = schema
        .primary_key_columns()
        .iter()
        .map(|col| quote_ident(&col.name))
        .collect();
    parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&schema.entity_type),
        parts.join(", ")
    )
}

/// Renders a filter into a WHERE fragment, pushing operands onto `params`.
pub(crate) fn filter_sql(filter: &Filter, params: &mut Vec<Value>) -> String {
    match filter {
        Filter::Cmp { column, op, value } => {
            let op = match op {
                CmpOp::Eq => "=",
                CmpOp::Ne => "<>",
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
            };
            params.push(value.clone());
            format!("{} {op} ?", quote_ident(column))
        }
        Filter::And(parts) => {
            if parts.is_empty() {
                "(1 = 1)".to_string()
            } else {
                let rendered: Vec<String> =
                    parts.iter().map(|f| filter_sql(f, params)).collect();
                format!("({})", rendered.join(" AND "))
            }
        }
        Filter::Or(parts) => {
            if parts.is_empty() {
                "(1 = 0)".to_string()
            } else {
                let rendered: Vec<String> =
                    parts.iter().map(|f| filter_sql(f, params)).collect();
                format!("({})", rendered.join(" OR "))
            }
        }
        Filter::Not(inner) => format!("NOT {}", filter_sql(inner, params)),
    }
}

pub(crate) fn order_sql(order: &Order) -> String {
    let direction = match order.direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    };
    format!(" ORDER BY {} {direction}", quote_ident(&order.column))
}

/// LIMIT/OFFSET fragment. Skip without take uses the unbounded-limit form.
pub(crate) fn window_sql(skip: Option<u64>, take: Option<u64>) -> String {
    match (skip, take) {
        (None, None) => String::new(),
        (None, Some(take)) => format!(" LIMIT {take}"),
        (Some(skip), None) => format!(" LIMIT -1 OFFSET {skip}"),
        (Some(skip), Some(take)) => format!(" LIMIT {take} OFFSET {skip}"),
    }
}

/// Converts a parameter to its driver form.
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    }
}

/// Converts one JSON row field to its driver form per the column kind.
pub(crate) fn json_to_sql(
    entity_type: &str,
    column: &str,
    kind: ColumnKind,
    field: &serde_json::Value,
) -> Result<SqlValue, EngineError> {
    if field.is_null() {
        return Ok(SqlValue::Null);
    }
    let mismatch = || {
        EngineError::Backend(format!(
            "{entity_type}.{column} has no {kind:?} rendering for {field}"
        ))
    };
    match kind {
        ColumnKind::Text | ColumnKind::Timestamp => field
            .as_str()
            .map(|s| SqlValue::Text(s.to_string()))
            .ok_or_else(mismatch),
        ColumnKind::Integer => field
            .as_i64()
            .map(SqlValue::Integer)
            .ok_or_else(mismatch),
        ColumnKind::Real => field.as_f64().map(SqlValue::Real).ok_or_else(mismatch),
        ColumnKind::Bool => field
            .as_bool()
            .map(|b| SqlValue::Integer(i64::from(b)))
            .ok_or_else(mismatch),
        ColumnKind::Bytes => field
            .as_array()
            .and_then(|bytes| {
                bytes
                    .iter()
                    .map(|b| b.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>()
            })
            .map(SqlValue::Blob)
            .ok_or_else(mismatch),
    }
}

/// Converts one fetched column back into its JSON row field.
pub(crate) fn sql_to_json(kind: Option<ColumnKind>, value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(n) => match kind {
            Some(ColumnKind::Bool) => serde_json::Value::Bool(n != 0),
            _ => serde_json::json!(n),
        },
        ValueRef::Real(r) => serde_json::json!(r),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => serde_json::json!(b),
    }
}

/// Maps a constraint violation onto the field it names, e.g.
/// `UNIQUE constraint failed: people.id` onto `id`.
pub(crate) fn constraint_field(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, target)| target)
        .and_then(|target| target.rsplit_once('.').map(|(_, col)| col))
        .unwrap_or("unknown")
        .to_string()
}
