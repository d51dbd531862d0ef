//! Row and batch shapes handed to the writer.
//!
//! Every cell is a string; typing happens at statement-build time.

use crate::error::{Error, Result};

/// Column-major measurement batch: one timestamp literal per logical row and
/// one string cell per (column, row) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Column names, timestamp column excluded.
    pub names: Vec<String>,
    /// One timestamp literal per logical row.
    pub timestamps: Vec<String>,
    /// One cell vector per name, each holding one cell per timestamp.
    pub columns: Vec<Vec<String>>,
}

impl Batch {
    /// Number of logical rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Checks the shape invariant: one column vector per name and one cell
    /// per timestamp in each of them.
    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != self.names.len() {
            return Err(Error::MalformedInput(format!(
                "batch has {} names but {} columns",
                self.names.len(),
                self.columns.len()
            )));
        }
        for (name, column) in self.names.iter().zip(&self.columns) {
            if column.len() != self.timestamps.len() {
                return Err(Error::MalformedInput(format!(
                    "column {name:?} has {} cells for {} timestamps",
                    column.len(),
                    self.timestamps.len()
                )));
            }
        }
        Ok(())
    }

    /// Pivots homogeneous rows into a column-major batch. Rows must agree on
    /// their column names; an empty slice pivots to an empty batch.
    pub fn from_rows(rows: &[Row]) -> Result<Batch> {
        let Some(first) = rows.first() else {
            return Ok(Batch::default());
        };
        let mut batch = Batch {
            names: first.names.clone(),
            timestamps: Vec::with_capacity(rows.len()),
            columns: vec![Vec::with_capacity(rows.len()); first.names.len()],
        };
        for row in rows {
            row.validate()?;
            if row.names != batch.names {
                return Err(Error::MalformedInput(format!(
                    "row names {:?} do not match batch names {:?}",
                    row.names, batch.names
                )));
            }
            batch.timestamps.push(row.timestamp.clone());
            for (column, value) in batch.columns.iter_mut().zip(&row.values) {
                column.push(value.clone());
            }
        }
        Ok(batch)
    }
}

/// A single measurement row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub names: Vec<String>,
    pub timestamp: String,
    pub values: Vec<String>,
}

impl Row {
    pub fn validate(&self) -> Result<()> {
        if self.names.len() != self.values.len() {
            return Err(Error::MalformedInput(format!(
                "row has {} names but {} values",
                self.names.len(),
                self.values.len()
            )));
        }
        Ok(())
    }
}

/// One tag's worth of time-series points, with optional per-point comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBatch {
    pub tag: String,
    pub timestamps: Vec<String>,
    pub values: Vec<String>,
    /// Either empty or exactly one comment per point.
    pub comments: Vec<String>,
}

impl SeriesBatch {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.timestamps.len() {
            return Err(Error::MalformedInput(format!(
                "series {:?} has {} values for {} timestamps",
                self.tag,
                self.values.len(),
                self.timestamps.len()
            )));
        }
        if !self.comments.is_empty() && self.comments.len() != self.timestamps.len() {
            return Err(Error::MalformedInput(format!(
                "series {:?} has {} comments for {} timestamps",
                self.tag,
                self.comments.len(),
                self.timestamps.len()
            )));
        }
        Ok(())
    }
}
