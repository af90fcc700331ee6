//! Command interception points.
//!
//! Engines invoke the hooks around every executed statement; what happens
//! with them (audit logs, metrics) is the embedder's concern. No sink is
//! implemented here.

use std::time::Duration;
use veil_types::Value;

/// A statement about to be, or just, executed.
#[derive(Debug)]
pub struct CommandEvent<'a> {
    pub statement: &'a str,
    pub params: &'a [Value],
}

/// Before/after hooks invoked per executed statement.
pub trait CommandInterceptor: Send + Sync {
    fn before(&self, event: &CommandEvent<'_>) {
        let _ = event;
    }

    fn after(&self, event: &CommandEvent<'_>, elapsed: Duration) {
        let _ = (event, elapsed);
    }
}
