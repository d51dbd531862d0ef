//! SQL layer - type inference and dialect-aware statement construction

pub mod build;
pub mod infer;

pub use build::{ConflictPolicy, SqlValue, Statement};
pub use infer::ColumnKind;
