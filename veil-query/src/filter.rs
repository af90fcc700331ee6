//! The predicate AST.
//!
//! Conditions name a column, an operator and a scalar operand. SQL engines
//! translate the tree into a parameterized WHERE clause; the in-memory
//! reference engine evaluates it directly against the serialized row via
//! [`Filter::matches_row`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use veil_types::Value;

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A composable predicate over entity columns.
///
/// Comparison against a missing column or a `Null` value never matches,
/// mirroring SQL's unknown semantics; `Not` is plain boolean negation of
/// the inner match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Cmp {
        column: String,
        op: CmpOp,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    fn cmp(column: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        Self::Cmp {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Eq, value)
    }

    /// `column <> value`
    #[must_use]
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Ne, value)
    }

    /// `column < value`
    #[must_use]
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Lt, value)
    }

    /// `column <= value`
    #[must_use]
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Le, value)
    }

    /// `column > value`
    #[must_use]
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Gt, value)
    }

    /// `column >= value`
    #[must_use]
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Ge, value)
    }

    /// Conjunction with another predicate.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjunction with another predicate.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the predicate against a serialized entity row.
    ///
    /// An empty `And` matches everything; an empty `Or` matches nothing.
    #[must_use]
    pub fn matches_row(&self, row: &serde_json::Value) -> bool {
        match self {
            Self::Cmp { column, op, value } => {
                let Some(field) = row.get(column) else {
                    return false;
                };
                let Some(actual) = Value::from_json(field) else {
                    return false;
                };
                match actual.compare(value) {
                    None => false,
                    Some(ordering) => match op {
                        CmpOp::Eq => ordering == Ordering::Equal,
                        CmpOp::Ne => ordering != Ordering::Equal,
                        CmpOp::Lt => ordering == Ordering::Less,
                        CmpOp::Le => ordering != Ordering::Greater,
                        CmpOp::Gt => ordering == Ordering::Greater,
                        CmpOp::Ge => ordering != Ordering::Less,
                    },
                }
            }
            Self::And(parts) => parts.iter().all(|f| f.matches_row(row)),
            Self::Or(parts) => parts.iter().any(|f| f.matches_row(row)),
            Self::Not(inner) => !inner.matches_row(row),
        }
    }
}
