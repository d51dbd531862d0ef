//! Column type inference over string samples.
//!
//! One classification routine serves every write path; batch imports sample
//! the first row, row imports classify each row on its own.

use crate::config::Dialect;
use crate::model::{Batch, Row};

/// Cell literal that forces a numeric classification even though it does not
/// parse as a number. Compared against the raw cell, untrimmed.
pub const FLOAT_SENTINEL: &str = "float";

/// SQL-level classification of an import column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Classifies a single sampled cell. Integer parse is tried before float
    /// parse; everything unparseable lands in text.
    pub fn from_sample(sample: &str) -> ColumnKind {
        let trimmed = sample.trim();
        if trimmed.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if trimmed.parse::<f64>().is_ok() || sample == FLOAT_SENTINEL {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    /// Column type keyword for generated DDL. Integer columns widen to the
    /// engine's floating type; import tables never carry an integer column.
    pub fn sql_type(self, dialect: Dialect) -> &'static str {
        match self {
            ColumnKind::Integer | ColumnKind::Float => dialect.float_type(),
            ColumnKind::Text => "TEXT",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// Classifies each batch column from its first cell. Later cells never
/// change the classification; a column with no cells falls back to text.
pub fn batch_column_kinds(batch: &Batch) -> Vec<ColumnKind> {
    batch
        .columns
        .iter()
        .map(|column| match column.first() {
            Some(sample) => ColumnKind::from_sample(sample),
            None => ColumnKind::Text,
        })
        .collect()
}

/// Classifies each value of a single row.
pub fn row_column_kinds(row: &Row) -> Vec<ColumnKind> {
    row.values
        .iter()
        .map(|value| ColumnKind::from_sample(value))
        .collect()
}
