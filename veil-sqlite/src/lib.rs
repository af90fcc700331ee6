//! SQLite execution engine for veil.
//!
//! Implements [`veil_repo::ExecutionEngine`] over a rusqlite connection:
//! schema DDL is derived from the registry, the filter AST is translated
//! into parameterized SQL (caller values are never concatenated into
//! statement text), saves run in one transaction rolled back entirely on
//! failure, and the column cipher set is applied at the row boundary — the
//! database file only ever sees ciphertext for designated columns.
//!
//! The connection lives behind a mutex: rusqlite connections are not
//! `Sync`, and exclusive access per statement matches the layer's
//! single-writer-per-context discipline.

mod config;
mod engine;
mod sql;

pub use config::SqliteOptions;
pub use engine::SqliteEngine;
