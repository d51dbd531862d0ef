//! Configuration constants for the ingestion layer
//!
//! This module centralizes all tunable parameters and constants used
//! throughout the crate, plus the [`DbConfig`] describing the backing store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Operation Gate Configuration
// ============================================================================

/// How many operations may wait for the connection at once. Arrivals beyond
/// this quota queue for an admission slot like everyone else.
pub const MAX_WAITING_OPS: usize = 10;

pub const ADMIT_TIMEOUT: Duration = Duration::from_secs(10); // admission only

// ============================================================================
// Write Path Configuration
// ============================================================================

/// Total attempts per row during a row import, first try included.
pub const ROW_RETRY_ATTEMPTS: u32 = 3;

pub const ROW_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Points per flushed chunk of a series insert. Each chunk is one
/// transactional write; earlier chunks stay committed if a later one fails.
pub const SERIES_CHUNK_ROWS: usize = 100_000;

/// Upper bound on bind parameters in a single statement
///
/// PostgreSQL caps a statement at 65535 parameters and SQLite at 32766.
/// Staying well under both lets the same splitting rule serve either engine,
/// so a logical batch becomes several statements inside one transaction.
pub const MAX_BIND_PARAMS: usize = 16_000;

// ============================================================================
// Read Path Configuration
// ============================================================================

/// Row cap for a single unread-sensor read. The consumer is expected to mark
/// what it took and come back for more.
pub const UNREAD_ROW_LIMIT: usize = 1000;

pub const READ_LOG_INTERVAL: usize = 1000;

/// Layout used when rendering timestamps back into row cells.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// ============================================================================
// Logging Configuration
// ============================================================================

/// Statements longer than this log a head-and-tail preview instead of the
/// full text.
pub const STATEMENT_LOG_LIMIT: usize = 2000;

pub const STATEMENT_PREVIEW_CHARS: usize = 500;

// ============================================================================
// Database Configuration
// ============================================================================

pub const DEFAULT_DB_FILE: &str = "data.db";

pub const DEFAULT_SERIES_TABLE: &str = "measurements";

pub const DEFAULT_PG_PORT: u16 = 5432;

/// Storage engine behind the ingestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Embedded file-backed engine.
    #[default]
    Sqlite,
    /// Networked server engine.
    Postgres,
}

impl Dialect {
    /// Column type keyword for timestamps in generated DDL.
    pub fn timestamp_type(self) -> &'static str {
        match self {
            Dialect::Sqlite => "DATETIME",
            Dialect::Postgres => "TIMESTAMP",
        }
    }

    /// Column type keyword for numeric measurement columns in generated DDL.
    /// Both keywords name the engine's 8-byte float, so readings written as
    /// `f64` decode back as `f64`.
    pub fn float_type(self) -> &'static str {
        match self {
            Dialect::Sqlite => "REAL",
            Dialect::Postgres => "DOUBLE PRECISION",
        }
    }
}

fn default_file() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_table() -> String {
    DEFAULT_SERIES_TABLE.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PG_PORT
}

/// Connection settings for either engine.
///
/// `location` is the directory holding the database file (embedded) or the
/// server host (networked); `name` is the file name or the database name.
/// Credentials and `port` only matter for the networked engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct DbConfig {
    #[serde(default)]
    #[builder(default)]
    pub dialect: Dialect,
    #[serde(default = "default_file")]
    #[builder(setter(into), default = "default_file()")]
    pub name: String,
    #[serde(default)]
    #[builder(setter(into), default)]
    pub location: String,
    #[serde(default)]
    #[builder(setter(into), default)]
    pub user: String,
    #[serde(default)]
    #[builder(setter(into), default)]
    pub password: String,
    #[serde(default = "default_port")]
    #[builder(default = "default_port()")]
    pub port: u16,
    /// Table receiving series inserts.
    #[serde(default = "default_table")]
    #[builder(setter(into), default = "default_table()")]
    pub table: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            name: default_file(),
            location: String::new(),
            user: String::new(),
            password: String::new(),
            port: default_port(),
            table: default_table(),
        }
    }
}

impl DbConfig {
    /// Path of the embedded database file. An empty `location` resolves to
    /// the working directory.
    pub fn sqlite_path(&self) -> PathBuf {
        if self.location.is_empty() {
            PathBuf::from(&self.name)
        } else {
            Path::new(&self.location).join(&self.name)
        }
    }

    /// Human-readable connection target for logs and errors. Never includes
    /// credentials.
    pub fn target(&self) -> String {
        match self.dialect {
            Dialect::Sqlite => self.sqlite_path().display().to_string(),
            Dialect::Postgres => format!("{}:{}/{}", self.location, self.port, self.name),
        }
    }

    /// Table receiving series inserts; an empty configured name falls back
    /// to [`DEFAULT_SERIES_TABLE`].
    pub fn series_table(&self) -> &str {
        if self.table.is_empty() {
            DEFAULT_SERIES_TABLE
        } else {
            &self.table
        }
    }

    /// Rejects configurations that cannot identify a database.
    pub fn validate(&self) -> Result<()> {
        match self.dialect {
            Dialect::Sqlite if self.name.is_empty() => Err(Error::Config(
                "embedded engine needs a database file name".to_string(),
            )),
            Dialect::Postgres if self.location.is_empty() => Err(Error::Config(
                "networked engine needs a server host".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

// Passwords stay out of logs; everything else debug-prints as usual.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("dialect", &self.dialect)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("table", &self.table)
            .finish()
    }
}
