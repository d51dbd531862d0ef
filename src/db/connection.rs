//! Engine connections, statement execution, and row decoding.

use chrono::NaiveDateTime;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgRow, PgSslMode};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, PgConnection, Row as _, SqliteConnection};
use tracing::{trace, warn};

use crate::config::{DbConfig, Dialect, STATEMENT_LOG_LIMIT, STATEMENT_PREVIEW_CHARS};
use crate::error::{Error, Result};
use crate::sql::{SqlValue, Statement};

/// Fixed shape of a sensor-log row: timestamp plus three float readings.
pub(crate) type SensorRow = (NaiveDateTime, f64, f64, f64);

/// Single connection to either engine.
pub(crate) enum DbConnection {
    Sqlite(SqliteConnection),
    Postgres(PgConnection),
}

impl DbConnection {
    /// Opens the configured engine. The embedded engine creates the database
    /// file and its directory on demand.
    pub(crate) async fn open(config: &DbConfig) -> Result<DbConnection> {
        match config.dialect {
            Dialect::Sqlite => {
                let path = config.sqlite_path();
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        Error::Config(format!(
                            "cannot create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true);
                let conn = options.connect().await.map_err(|source| Error::Open {
                    target: config.target(),
                    source,
                })?;
                Ok(DbConnection::Sqlite(conn))
            }
            Dialect::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&config.location)
                    .port(config.port)
                    .username(&config.user)
                    .password(&config.password)
                    .database(&config.name)
                    .ssl_mode(PgSslMode::Disable);
                let conn = options.connect().await.map_err(|source| Error::Open {
                    target: config.target(),
                    source,
                })?;
                Ok(DbConnection::Postgres(conn))
            }
        }
    }

    pub(crate) async fn close(self) -> Result<()> {
        match self {
            DbConnection::Sqlite(conn) => conn.close().await?,
            DbConnection::Postgres(conn) => conn.close().await?,
        }
        Ok(())
    }

    /// Executes one statement and reports affected rows.
    pub(crate) async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        log_statement(&statement.sql);
        let affected = match self {
            DbConnection::Sqlite(conn) => {
                let mut query = sqlx::query(&statement.sql);
                for value in &statement.args {
                    query = bind_sqlite(query, value);
                }
                query.execute(&mut *conn).await?.rows_affected()
            }
            DbConnection::Postgres(conn) => {
                let mut query = sqlx::query(&statement.sql);
                for value in &statement.args {
                    query = bind_pg(query, value);
                }
                query.execute(&mut *conn).await?.rows_affected()
            }
        };
        Ok(affected)
    }

    /// Executes several statements inside one transaction. The whole set
    /// commits together or not at all.
    pub(crate) async fn execute_all(&mut self, statements: &[Statement]) -> Result<u64> {
        let mut affected = 0;
        match self {
            DbConnection::Sqlite(conn) => {
                let mut tx = conn.begin().await?;
                for statement in statements {
                    log_statement(&statement.sql);
                    let mut query = sqlx::query(&statement.sql);
                    for value in &statement.args {
                        query = bind_sqlite(query, value);
                    }
                    affected += query.execute(&mut *tx).await?.rows_affected();
                }
                tx.commit().await?;
            }
            DbConnection::Postgres(conn) => {
                let mut tx = conn.begin().await?;
                for statement in statements {
                    log_statement(&statement.sql);
                    let mut query = sqlx::query(&statement.sql);
                    for value in &statement.args {
                        query = bind_pg(query, value);
                    }
                    affected += query.execute(&mut *tx).await?.rows_affected();
                }
                tx.commit().await?;
            }
        }
        Ok(affected)
    }

    /// Runs a sensor-log SELECT. Rows with NULL readings or that fail to
    /// decode are skipped with a warning instead of failing the read.
    pub(crate) async fn fetch_sensor_rows(
        &mut self,
        statement: &Statement,
    ) -> Result<Vec<SensorRow>> {
        log_statement(&statement.sql);
        match self {
            DbConnection::Sqlite(conn) => {
                let rows = sqlx::query(&statement.sql).fetch_all(&mut *conn).await?;
                let mut decoded = Vec::with_capacity(rows.len());
                for row in &rows {
                    match decode_sqlite_row(row) {
                        Ok(Some(tuple)) => decoded.push(tuple),
                        Ok(None) => warn!("skipping sensor row with a NULL reading"),
                        Err(e) => warn!("skipping sensor row that failed to decode: {e}"),
                    }
                }
                Ok(decoded)
            }
            DbConnection::Postgres(conn) => {
                let rows = sqlx::query(&statement.sql).fetch_all(&mut *conn).await?;
                let mut decoded = Vec::with_capacity(rows.len());
                for row in &rows {
                    match decode_pg_row(row) {
                        Ok(Some(tuple)) => decoded.push(tuple),
                        Ok(None) => warn!("skipping sensor row with a NULL reading"),
                        Err(e) => warn!("skipping sensor row that failed to decode: {e}"),
                    }
                }
                Ok(decoded)
            }
        }
    }
}

fn bind_sqlite<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Timestamp(ts) => query.bind(*ts),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Null => query.bind(None::<f64>),
    }
}

fn bind_pg<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        SqlValue::Timestamp(ts) => query.bind(*ts),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Null => query.bind(None::<f64>),
    }
}

// A NULL reading decodes to None, never to a zero reading; the caller drops
// the whole row.
fn decode_sqlite_row(row: &SqliteRow) -> Result<Option<SensorRow>, sqlx::Error> {
    let timestamp: NaiveDateTime = row.try_get(0)?;
    let readings: (Option<f64>, Option<f64>, Option<f64>) =
        (row.try_get(1)?, row.try_get(2)?, row.try_get(3)?);
    Ok(match readings {
        (Some(temperature), Some(pressure), Some(humidity)) => {
            Some((timestamp, temperature, pressure, humidity))
        }
        _ => None,
    })
}

fn decode_pg_row(row: &PgRow) -> Result<Option<SensorRow>, sqlx::Error> {
    let timestamp: NaiveDateTime = row.try_get(0)?;
    let readings: (Option<f64>, Option<f64>, Option<f64>) =
        (row.try_get(1)?, row.try_get(2)?, row.try_get(3)?);
    Ok(match readings {
        (Some(temperature), Some(pressure), Some(humidity)) => {
            Some((timestamp, temperature, pressure, humidity))
        }
        _ => None,
    })
}

// Full statements at trace level; oversized ones log head and tail only.
fn log_statement(sql: &str) {
    if sql.len() <= STATEMENT_LOG_LIMIT {
        trace!(sql, "executing statement");
    } else {
        let total = sql.chars().count();
        let head: String = sql.chars().take(STATEMENT_PREVIEW_CHARS).collect();
        let tail: String = sql
            .chars()
            .skip(total.saturating_sub(STATEMENT_PREVIEW_CHARS))
            .collect();
        trace!("executing statement ({total} chars): {head} ... {tail}");
    }
}
