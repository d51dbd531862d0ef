//! Database layer - admission gate, connection plumbing, and the handle

mod connection;
mod gate;
mod handle;
mod reader;
mod writer;

pub use handle::Database;
pub use reader::{SENSOR_COLUMNS, SENSOR_TABLE};
pub use writer::SeriesInsertReport;
