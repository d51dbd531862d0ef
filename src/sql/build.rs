//! Statement construction for both engines.
//!
//! Builders are pure: they turn model shapes into [`Statement`] values with
//! positional bind arguments and never touch a connection. The networked
//! engine numbers its placeholders `$1..$n`, the embedded one uses `?`.

use chrono::NaiveDateTime;
use tracing::warn;

use crate::config::{Dialect, MAX_BIND_PARAMS, UNREAD_ROW_LIMIT};
use crate::error::{Error, Result};
use crate::model::{Batch, Row};
use crate::sql::infer::ColumnKind;

/// Timestamp layouts accepted in input cells, tried in order. RFC 3339
/// literals with an offset are handled separately.
const TIMESTAMP_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// What to do when a series insert collides with an existing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Surface the engine's constraint error.
    #[default]
    Fail,
    /// Append ON CONFLICT DO NOTHING and keep going.
    Ignore,
}

/// A positional bind argument.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Timestamp(NaiveDateTime),
    Float(f64),
    Int(i64),
    Text(String),
    Null,
}

/// One executable statement: SQL text plus bind arguments in placeholder
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    /// Statement with no bind arguments.
    pub fn bare(sql: impl Into<String>) -> Statement {
        Statement {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

/// Double-quotes an identifier, doubling embedded quotes. Quoting keeps
/// mixed-case measurement names intact on the networked engine.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Parses a timestamp cell. Input batches carry wall-clock literals without
/// an offset; RFC 3339 literals are accepted and normalized to UTC.
pub fn parse_timestamp(cell: &str) -> Result<NaiveDateTime> {
    let trimmed = cell.trim();
    for layout in TIMESTAMP_LAYOUTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.naive_utc());
    }
    Err(Error::Timestamp(cell.to_string()))
}

// Placeholder source for one statement. Numbering restarts per statement.
struct Placeholders {
    dialect: Dialect,
    next_idx: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Placeholders {
            dialect,
            next_idx: 1,
        }
    }

    fn next(&mut self) -> String {
        let marker = match self.dialect {
            Dialect::Postgres => format!("${}", self.next_idx),
            Dialect::Sqlite => "?".to_string(),
        };
        self.next_idx += 1;
        marker
    }
}

/// Renders a numeric-classified cell, substituting SQL NULL when the cell
/// does not parse. Never an error.
fn numeric_or_null(column: &str, cell: &str) -> SqlValue {
    match cell.trim().parse::<f64>() {
        Ok(value) => SqlValue::Float(value),
        Err(_) => {
            warn!(column, cell, "unparseable numeric cell, writing NULL");
            SqlValue::Null
        }
    }
}

fn render_cell(kind: ColumnKind, column: &str, cell: &str) -> SqlValue {
    if kind.is_numeric() {
        numeric_or_null(column, cell)
    } else {
        SqlValue::Text(cell.to_string())
    }
}

/// CREATE TABLE for an import target. Row-import tables track consumption
/// through an extra Fetched column; batch tables never carry one.
pub fn create_import_table(
    dialect: Dialect,
    table: &str,
    names: &[String],
    kinds: &[ColumnKind],
    track_fetched: bool,
) -> Statement {
    let mut columns = vec![format!("\"Timestamp\" {}", dialect.timestamp_type())];
    for (name, kind) in names.iter().zip(kinds) {
        columns.push(format!(
            "{} {} DEFAULT NULL",
            quote_ident(name),
            kind.sql_type(dialect)
        ));
    }
    if track_fetched {
        columns.push("\"Fetched\" INTEGER DEFAULT 0".to_string());
    }
    Statement::bare(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    ))
}

/// CREATE TABLE for the fixed series layout.
pub fn create_series_table(dialect: Dialect, table: &str) -> Statement {
    Statement::bare(format!(
        "CREATE TABLE IF NOT EXISTS {} (time {}, tag TEXT NOT NULL, \
         value DOUBLE PRECISION NULL, comment TEXT DEFAULT '')",
        quote_ident(table),
        dialect.timestamp_type()
    ))
}

/// Multi-row INSERT statements for a batch. Tuples are the timestamp
/// followed by the named columns in batch order; the batch splits into
/// several statements when one would exceed the bind parameter budget.
pub fn insert_batch(
    dialect: Dialect,
    table: &str,
    batch: &Batch,
    kinds: &[ColumnKind],
) -> Result<Vec<Statement>> {
    let width = batch.names.len() + 1;
    let rows_per_statement = (MAX_BIND_PARAMS / width).max(1);

    let mut column_list = vec!["\"Timestamp\"".to_string()];
    column_list.extend(batch.names.iter().map(|name| quote_ident(name)));
    let column_list = column_list.join(", ");

    let mut statements = Vec::new();
    let total = batch.len();
    let mut start = 0;
    while start < total {
        let end = (start + rows_per_statement).min(total);
        let mut placeholders = Placeholders::new(dialect);
        let mut value_groups = Vec::with_capacity(end - start);
        let mut args = Vec::with_capacity((end - start) * width);
        for idx in start..end {
            let mut group = Vec::with_capacity(width);
            group.push(placeholders.next());
            args.push(SqlValue::Timestamp(parse_timestamp(
                &batch.timestamps[idx],
            )?));
            for ((name, kind), column) in batch.names.iter().zip(kinds).zip(&batch.columns) {
                group.push(placeholders.next());
                args.push(render_cell(*kind, name, &column[idx]));
            }
            value_groups.push(format!("({})", group.join(", ")));
        }
        statements.push(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}",
                quote_ident(table),
                column_list,
                value_groups.join(", ")
            ),
            args,
        });
        start = end;
    }
    Ok(statements)
}

/// Single-row INSERT against a Fetched-tracking import table.
pub fn insert_row(
    dialect: Dialect,
    table: &str,
    row: &Row,
    kinds: &[ColumnKind],
) -> Result<Statement> {
    let mut placeholders = Placeholders::new(dialect);
    let mut markers = vec![placeholders.next()];
    let mut args = vec![SqlValue::Timestamp(parse_timestamp(&row.timestamp)?)];
    for ((name, kind), value) in row.names.iter().zip(kinds).zip(&row.values) {
        markers.push(placeholders.next());
        args.push(render_cell(*kind, name, value));
    }

    let mut column_list = vec!["\"Timestamp\"".to_string()];
    column_list.extend(row.names.iter().map(|name| quote_ident(name)));
    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list.join(", "),
            markers.join(", ")
        ),
        args,
    })
}

/// INSERT statements for one flushed chunk of a series. The comment column
/// is written only when the chunk carries comments.
pub fn insert_series_chunk(
    dialect: Dialect,
    table: &str,
    tag: &str,
    timestamps: &[String],
    values: &[String],
    comments: Option<&[String]>,
    policy: ConflictPolicy,
) -> Result<Vec<Statement>> {
    let width = if comments.is_some() { 4 } else { 3 };
    let rows_per_statement = (MAX_BIND_PARAMS / width).max(1);
    let column_list = if comments.is_some() {
        "time, tag, value, comment"
    } else {
        "time, tag, value"
    };
    let conflict_clause = match policy {
        ConflictPolicy::Ignore => " ON CONFLICT DO NOTHING",
        ConflictPolicy::Fail => "",
    };

    let mut statements = Vec::new();
    let total = timestamps.len();
    let mut start = 0;
    while start < total {
        let end = (start + rows_per_statement).min(total);
        let mut placeholders = Placeholders::new(dialect);
        let mut value_groups = Vec::with_capacity(end - start);
        let mut args = Vec::with_capacity((end - start) * width);
        for idx in start..end {
            let mut group = Vec::with_capacity(width);
            group.push(placeholders.next());
            args.push(SqlValue::Timestamp(parse_timestamp(&timestamps[idx])?));
            group.push(placeholders.next());
            args.push(SqlValue::Text(tag.to_string()));
            group.push(placeholders.next());
            args.push(numeric_or_null("value", &values[idx]));
            if let Some(comments) = comments {
                group.push(placeholders.next());
                args.push(SqlValue::Text(comments[idx].clone()));
            }
            value_groups.push(format!("({})", group.join(", ")));
        }
        statements.push(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}{}",
                quote_ident(table),
                column_list,
                value_groups.join(", "),
                conflict_clause
            ),
            args,
        });
        start = end;
    }
    Ok(statements)
}

/// ALTER TABLE adding a nullable floating column. The embedded engine does
/// not accept IF NOT EXISTS here; its duplicate-column error is treated as
/// success by the caller instead.
pub fn add_column(dialect: Dialect, table: &str, column: &str) -> Statement {
    let if_not_exists = match dialect {
        Dialect::Postgres => "IF NOT EXISTS ",
        Dialect::Sqlite => "",
    };
    Statement::bare(format!(
        "ALTER TABLE {} ADD COLUMN {}{} {} DEFAULT NULL",
        quote_ident(table),
        if_not_exists,
        quote_ident(column),
        dialect.float_type()
    ))
}

/// UPDATE flagging the closed timestamp interval `[first, last]` as fetched.
pub fn mark_fetched(dialect: Dialect, table: &str, first: &str, last: &str) -> Result<Statement> {
    let mut placeholders = Placeholders::new(dialect);
    let flag = placeholders.next();
    let upper = placeholders.next();
    let lower = placeholders.next();
    Ok(Statement {
        sql: format!(
            "UPDATE {} SET \"Fetched\" = {} WHERE \"Timestamp\" <= {} AND \"Timestamp\" >= {}",
            quote_ident(table),
            flag,
            upper,
            lower
        ),
        args: vec![
            SqlValue::Int(1),
            SqlValue::Timestamp(parse_timestamp(last)?),
            SqlValue::Timestamp(parse_timestamp(first)?),
        ],
    })
}

/// SELECT for unread sensor rows, oldest first, capped at the read limit.
pub fn select_unread(table: &str, columns: &[&str; 3]) -> Statement {
    Statement::bare(format!(
        "SELECT \"Timestamp\", {}, {}, {} FROM {} WHERE \"Fetched\" = 0 \
         ORDER BY \"Timestamp\" LIMIT {}",
        quote_ident(columns[0]),
        quote_ident(columns[1]),
        quote_ident(columns[2]),
        quote_ident(table),
        UNREAD_ROW_LIMIT
    ))
}

/// Unbounded SELECT of the same four-column shape, in storage order.
pub fn select_all(table: &str, columns: &[&str; 3]) -> Statement {
    Statement::bare(format!(
        "SELECT \"Timestamp\", {}, {}, {} FROM {}",
        quote_ident(columns[0]),
        quote_ident(columns[1]),
        quote_ident(columns[2]),
        quote_ident(table)
    ))
}
