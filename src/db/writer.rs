//! Write surface: batch imports, row imports with retry, series inserts.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ROW_RETRY_ATTEMPTS, ROW_RETRY_BACKOFF, SERIES_CHUNK_ROWS};
use crate::db::handle::Database;
use crate::error::{Error, Result};
use crate::model::{Batch, Row, SeriesBatch};
use crate::sql::{ConflictPolicy, build, infer};

/// Outcome of a chunked series insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeriesInsertReport {
    /// Points handed in.
    pub points: usize,
    /// Chunks flushed.
    pub chunks: usize,
    /// Rows the engine reports as written. Lower than `points` when
    /// conflicting points are ignored.
    pub rows_written: u64,
}

impl Database {
    /// Imports a column-major batch: classifies columns from the first row,
    /// creates the table when missing, and writes every row in one
    /// transaction. Returns the number of rows written.
    pub async fn insert_batch(&self, table: &str, batch: &Batch) -> Result<u64> {
        batch.validate()?;
        if batch.is_empty() {
            debug!("skipping empty batch for table {table:?}");
            return Ok(0);
        }
        let kinds = infer::batch_column_kinds(batch);
        let ddl = build::create_import_table(self.dialect(), table, &batch.names, &kinds, false);
        self.execute(&ddl).await?;
        let statements = build::insert_batch(self.dialect(), table, batch, &kinds)?;
        let written = self.execute_transactional(&statements).await?;
        info!("imported {written} rows into {table:?}");
        Ok(written)
    }

    /// Imports a single row into a consumption-tracked table, creating the
    /// table when missing. Each row is classified on its own, so rows of
    /// differing shape may target different tables freely.
    pub async fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        row.validate()?;
        let kinds = infer::row_column_kinds(row);
        let ddl = build::create_import_table(self.dialect(), table, &row.names, &kinds, true);
        self.execute(&ddl).await?;
        let statement = build::insert_row(self.dialect(), table, row, &kinds)?;
        self.execute(&statement).await?;
        Ok(())
    }

    /// Imports rows one at a time with a bounded retry budget per row. Rows
    /// that exhaust the budget ride back in [`Error::RowImport`]; rows
    /// written before and after a failure stay written, and so do tables or
    /// columns created on the way.
    pub async fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        let mut failed = Vec::new();
        for row in rows {
            let mut attempts = 0;
            loop {
                attempts += 1;
                match self.insert_row(table, row).await {
                    Ok(()) => break,
                    Err(e) if attempts < ROW_RETRY_ATTEMPTS => {
                        warn!(
                            "attempt {attempts} failed for row at {}: {e}, retrying",
                            row.timestamp
                        );
                        sleep(ROW_RETRY_BACKOFF).await;
                    }
                    Err(e) => {
                        warn!(
                            "giving up on row at {} after {attempts} attempts: {e}",
                            row.timestamp
                        );
                        failed.push(row.clone());
                        break;
                    }
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::RowImport {
                failed,
                total: rows.len(),
            })
        }
    }

    /// Inserts one tag's series into the configured series table, creating
    /// it when missing, in transactional chunks. Earlier chunks stay
    /// committed when a later one fails.
    pub async fn insert_series(
        &self,
        series: &SeriesBatch,
        policy: ConflictPolicy,
    ) -> Result<SeriesInsertReport> {
        series.validate()?;
        let mut report = SeriesInsertReport {
            points: series.len(),
            ..Default::default()
        };
        if series.is_empty() {
            return Ok(report);
        }
        let table = self.series_table();
        self.execute(&build::create_series_table(self.dialect(), table))
            .await?;
        let comments = (!series.comments.is_empty()).then_some(series.comments.as_slice());
        let mut comment_chunks = comments.map(|c| c.chunks(SERIES_CHUNK_ROWS));

        let timestamp_chunks = series.timestamps.chunks(SERIES_CHUNK_ROWS);
        let value_chunks = series.values.chunks(SERIES_CHUNK_ROWS);
        for (timestamps, values) in timestamp_chunks.zip(value_chunks) {
            let comment_chunk = comment_chunks.as_mut().and_then(|chunks| chunks.next());
            let statements = build::insert_series_chunk(
                self.dialect(),
                table,
                &series.tag,
                timestamps,
                values,
                comment_chunk,
                policy,
            )?;
            report.rows_written += self.execute_transactional(&statements).await?;
            report.chunks += 1;
            debug!(
                "flushed chunk {} ({} points) of series {:?}",
                report.chunks,
                timestamps.len(),
                series.tag
            );
        }
        info!(
            "inserted {} points of series {:?} in {} chunks",
            report.points, series.tag, report.chunks
        );
        Ok(report)
    }

    /// Creates the fixed-layout series table when missing.
    pub async fn create_series_table(&self) -> Result<()> {
        let statement = build::create_series_table(self.dialect(), self.series_table());
        self.execute(&statement).await?;
        Ok(())
    }

    /// Adds a nullable floating column. Adding a column that already exists
    /// succeeds on both engines.
    pub async fn add_column(&self, table: &str, column: &str) -> Result<()> {
        let statement = build::add_column(self.dialect(), table, column);
        match self.execute(&statement).await {
            Ok(_) => Ok(()),
            Err(Error::Statement(e)) if is_duplicate_column(&e) => {
                debug!("column {column:?} already exists on {table:?}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

// The embedded engine has no IF NOT EXISTS for ADD COLUMN; its error text is
// the success signal instead.
fn is_duplicate_column(error: &sqlx::Error) -> bool {
    let message = error.to_string();
    message.contains("duplicate column") || message.contains("already exists")
}
