// Public API - the handle, its configuration, and the model shapes
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod sql;

pub use config::{DbConfig, DbConfigBuilder, Dialect};
pub use db::{Database, SENSOR_COLUMNS, SENSOR_TABLE, SeriesInsertReport};
pub use error::{Error, Result};
pub use model::{Batch, Row, SeriesBatch};
pub use sql::{ColumnKind, ConflictPolicy};
