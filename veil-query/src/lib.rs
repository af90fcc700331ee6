//! Read-intent descriptors and query composition.
//!
//! A read request is described by an immutable [`QuerySpec`] — predicate,
//! single-key ordering, eager-load includes, paging window, tracking mode —
//! and composed by [`compose`] into the validated [`AbstractQuery`] handed
//! to the execution engine. Predicates are a column/operator/value
//! [`Filter`] AST rather than closures: one representation serves both SQL
//! translation and in-memory evaluation.

mod composer;
mod error;
mod filter;
mod spec;

pub use composer::{compose, AbstractQuery};
pub use error::{QueryError, QueryResult};
pub use filter::{CmpOp, Filter};
pub use spec::{Direction, Order, QuerySpec, TrackingMode};
