//! The immutable descriptor of a read intent.

use crate::Filter;
use serde::{Deserialize, Serialize};

/// Whether materialized entities are registered for change detection.
///
/// Untracked results must never be staged for mutation; tracked results
/// may be handed to write operations without re-attachment. Reads default
/// to `Untracked`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    Tracked,
    #[default]
    Untracked,
}

/// Sort direction of the single ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

/// The single ordering key of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A composable read intent: predicate, ordering, includes, window,
/// tracking.
///
/// One ordering key is supported per query, ascending or descending —
/// setting a new one replaces the previous. The window applies only after
/// filter and ordering; paging an unordered query yields an unspecified
/// row order (callers should always order before paging).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub filter: Option<Filter>,
    pub order: Option<Order>,
    pub includes: Vec<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub tracking: TrackingMode,
}

impl QuerySpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Orders ascending by the given column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Orders descending by the given column.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Descending,
        });
        self
    }

    /// Appends an eager-load include. Includes are applied in the order
    /// they were added.
    #[must_use]
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(relation.into());
        self
    }

    /// Skips the first `n` rows of the filtered, ordered result.
    #[must_use]
    pub const fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Caps the result at `n` rows, applied after `skip`.
    #[must_use]
    pub const fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    /// Requests tracked materialization for a subsequent write.
    #[must_use]
    pub const fn tracked(mut self) -> Self {
        self.tracking = TrackingMode::Tracked;
        self
    }
}
