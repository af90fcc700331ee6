//! Composition of a [`QuerySpec`] into the engine-facing form.

use crate::{Filter, Order, QueryError, QueryResult, QuerySpec, TrackingMode};
use tracing::warn;
use veil_model::{Entity, SchemaRegistry};

/// The validated, engine-facing form of a read intent.
///
/// Construction order is part of the contract: the predicate precedes
/// includes, ordering and the window, so a paging window can never bypass
/// the filter. Includes are an ordered fold; each one augments the query
/// independently, affecting eager-loading breadth but never the result
/// set. Window values are validated non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractQuery {
    pub entity_type: &'static str,
    pub filter: Option<Filter>,
    pub includes: Vec<String>,
    pub order: Option<Order>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub tracking: TrackingMode,
}

/// Composes a read query for `E` from a spec.
///
/// Fails with [`QueryError::UnknownEntityType`] when `E` was never
/// registered, and [`QueryError::InvalidArgument`] for negative window
/// values or include names that are not declared relations. Paging
/// without ordering composes successfully but logs a warning: the page
/// content is nondeterministic.
pub fn compose<E: Entity>(
    registry: &SchemaRegistry,
    spec: QuerySpec,
) -> QueryResult<AbstractQuery> {
    let Some(schema) = registry.get(E::NAME) else {
        return Err(QueryError::UnknownEntityType(E::NAME.to_string()));
    };

    let skip = validate_window(spec.skip, "skip")?;
    let take = validate_window(spec.take, "take")?;

    for include in &spec.includes {
        if !schema.has_relation(include) {
            return Err(QueryError::InvalidArgument(format!(
                "{} declares no relation named {include}",
                E::NAME
            )));
        }
    }

    if (skip.is_some() || take.is_some()) && spec.order.is_none() {
        warn!(
            entity_type = E::NAME,
            "paging an unordered query; page content is nondeterministic"
        );
    }

    Ok(AbstractQuery {
        entity_type: E::NAME,
        filter: spec.filter,
        includes: spec.includes,
        order: spec.order,
        skip,
        take,
        tracking: spec.tracking,
    })
}

fn validate_window(value: Option<i64>, name: &str) -> QueryResult<Option<u64>> {
    match value {
        None => Ok(None),
        Some(n) if n < 0 => Err(QueryError::InvalidArgument(format!(
            "{name} must be non-negative, got {n}"
        ))),
        Some(n) => Ok(Some(n as u64)),
    }
}
