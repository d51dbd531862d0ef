//! Error taxonomy for the ingestion layer.

use std::time::Duration;

use thiserror::Error;

use crate::model::Row;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal configuration problem, including an attempt to install a second
    /// process-wide handle with a different configuration.
    #[error("invalid database configuration: {0}")]
    Config(String),

    /// The backing store could not be opened.
    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The handle's connection has already been released.
    #[error("database handle is closed")]
    Closed,

    /// No operation slot became available within the admission deadline.
    /// Retryable by the caller.
    #[error("timed out after {0:?} waiting for a database operation slot")]
    GateTimeout(Duration),

    /// Batch or row shape violation.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A timestamp literal none of the accepted layouts recognize. Aborts
    /// the statement it was destined for.
    #[error("unrecognized timestamp literal {0:?}")]
    Timestamp(String),

    /// Statement execution failed.
    #[error("statement execution failed: {0}")]
    Statement(#[from] sqlx::Error),

    /// One or more rows exhausted their retry budget during a row import.
    /// The rows that never made it in are carried for the caller.
    #[error("failed to import {} of {total} rows", .failed.len())]
    RowImport { failed: Vec<Row>, total: usize },
}
