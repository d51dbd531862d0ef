//! Read surface for the sensor log.

use tracing::info;

use crate::config::{READ_LOG_INTERVAL, TIMESTAMP_FORMAT};
use crate::db::connection::SensorRow;
use crate::db::handle::Database;
use crate::error::Result;
use crate::model::Batch;
use crate::sql::build;

/// Table the sensor producer writes into.
pub const SENSOR_TABLE: &str = "sensor_data";

/// Fixed measurement columns of the sensor log.
pub const SENSOR_COLUMNS: [&str; 3] = ["Temperature", "Pressure", "Humidity"];

impl Database {
    /// Reads sensor rows not yet marked as fetched, oldest first, capped at
    /// [`crate::config::UNREAD_ROW_LIMIT`] rows per call. The consumer marks
    /// what it took and comes back for the rest.
    pub async fn read_unread_sensor_rows(&self) -> Result<Batch> {
        let statement = build::select_unread(SENSOR_TABLE, &SENSOR_COLUMNS);
        let rows = self.fetch_sensor_rows(&statement).await?;
        Ok(sensor_batch(rows, false))
    }

    /// Reads every row of a sensor-shaped table, reporting progress along
    /// the way on large tables.
    pub async fn read_all_rows(&self, table: &str) -> Result<Batch> {
        let statement = build::select_all(table, &SENSOR_COLUMNS);
        let rows = self.fetch_sensor_rows(&statement).await?;
        info!("read {} rows from {table:?}", rows.len());
        Ok(sensor_batch(rows, true))
    }

    /// Marks every sensor row in the closed interval `[first, last]` as
    /// fetched. Returns how many rows were affected.
    pub async fn mark_fetched(&self, first: &str, last: &str) -> Result<u64> {
        let statement = build::mark_fetched(self.dialect(), SENSOR_TABLE, first, last)?;
        let affected = self.execute(&statement).await?;
        info!("marked {affected} sensor rows fetched between {first} and {last}");
        Ok(affected)
    }
}

// Renders fetched tuples back into the string-typed batch shape.
fn sensor_batch(rows: Vec<SensorRow>, log_progress: bool) -> Batch {
    let mut batch = Batch {
        names: SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        timestamps: Vec::with_capacity(rows.len()),
        columns: vec![Vec::with_capacity(rows.len()); SENSOR_COLUMNS.len()],
    };
    for (idx, (timestamp, temperature, pressure, humidity)) in rows.into_iter().enumerate() {
        batch
            .timestamps
            .push(timestamp.format(TIMESTAMP_FORMAT).to_string());
        batch.columns[0].push(format!("{temperature:.6}"));
        batch.columns[1].push(format!("{pressure:.6}"));
        batch.columns[2].push(format!("{humidity:.6}"));
        if log_progress && (idx + 1) % READ_LOG_INTERVAL == 0 {
            info!("processed {} rows", idx + 1);
        }
    }
    batch
}
