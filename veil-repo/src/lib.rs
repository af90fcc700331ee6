//! Repository ports and change-state management.
//!
//! The write path runs through a call-scoped [`ChangeContext`] — the state
//! machine that stages entity transitions (attach, modify, remove) before a
//! save — and the read path through the query composer into an
//! [`ExecutionEngine`]. [`Repository`] ties both together behind the
//! [`ReadPort`] / [`WritePort`] capability traits; extension is composition
//! (wrap a repository), not inheritance.
//!
//! The engine is an external collaborator: anything that can execute an
//! [`veil_query::AbstractQuery`], resolve a key, run aggregates and commit
//! a staged change-set atomically. [`MemoryEngine`] is the bundled
//! reference implementation used by tests and embedded deployments;
//! `veil-sqlite` provides the relational one.
//!
//! A context is owned by one logical unit of work and is not safe for
//! concurrent mutation from multiple threads; that single-writer
//! discipline is documented, not enforced by a lock.

mod context;
mod engine;
mod error;
mod interceptor;
mod memory;
mod ports;

pub use context::{ChangeContext, ChangeState, StagedOp};
pub use engine::{EngineError, EngineResult, ExecutionEngine, FieldError, SaveReport};
pub use error::{RepoError, RepoResult, ValidationFailed};
pub use interceptor::{CommandEvent, CommandInterceptor};
pub use memory::MemoryEngine;
pub use ports::{ReadPort, Repository, WritePort};
