//! Connection configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_create_dirs() -> bool {
    true
}

/// Options for opening the SQLite engine, bindable from any serde config
/// source.
///
/// TLS and certificate bootstrap have no SQLite equivalent; the engine
/// only needs a resolvable path (or nothing, for an in-memory database).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteOptions {
    /// Database file path. `None` opens an in-memory database.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How long a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Create missing parent directories of `path` on open.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            create_dirs: default_create_dirs(),
        }
    }
}

impl SqliteOptions {
    /// An in-memory database, mainly for tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A file-backed database at the given path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The busy timeout as a `Duration`.
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
