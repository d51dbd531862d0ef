//! The public database handle and its lifecycle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::info;

use crate::config::{DbConfig, Dialect};
use crate::db::connection::{DbConnection, SensorRow};
use crate::db::gate::OperationGate;
use crate::error::{Error, Result};
use crate::sql::Statement;

static GLOBAL: OnceLock<Database> = OnceLock::new();

/// Handle to the single gated connection. Cloning is cheap; every clone
/// shares the same gate and connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    config: DbConfig,
    gate: OperationGate,
    conn: Mutex<Option<DbConnection>>,
}

impl Database {
    /// Opens a handle for the given configuration. The composition root
    /// calls this once and passes clones to whoever needs the store.
    pub async fn open(config: DbConfig) -> Result<Database> {
        config.validate()?;
        let conn = DbConnection::open(&config).await?;
        info!("opened database {}", config.target());
        Ok(Database {
            inner: Arc::new(DatabaseInner {
                config,
                gate: OperationGate::new(),
                conn: Mutex::new(Some(conn)),
            }),
        })
    }

    /// Opens the process-wide handle, or returns the installed one when its
    /// configuration is identical. A different configuration fails loudly
    /// instead of silently reconfiguring.
    pub async fn open_global(config: &DbConfig) -> Result<Database> {
        if let Some(existing) = GLOBAL.get() {
            existing.check_same_config(config)?;
            return Ok(existing.clone());
        }
        let opened = Database::open(config.clone()).await?;
        match GLOBAL.set(opened.clone()) {
            Ok(()) => Ok(opened),
            Err(_) => {
                // Another opener won the race; keep theirs.
                opened.close().await?;
                match GLOBAL.get() {
                    Some(existing) => {
                        existing.check_same_config(config)?;
                        Ok(existing.clone())
                    }
                    None => Err(Error::Config(
                        "process-wide handle disappeared during initialization".to_string(),
                    )),
                }
            }
        }
    }

    /// The installed process-wide handle, when one exists.
    pub fn global() -> Option<Database> {
        GLOBAL.get().cloned()
    }

    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    /// Releases the connection. Closing twice is a no-op; operations after
    /// close fail with [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.inner.conn.lock().await;
        if let Some(conn) = guard.take() {
            conn.close().await?;
            info!("closed database {}", self.inner.config.target());
        }
        Ok(())
    }

    fn check_same_config(&self, config: &DbConfig) -> Result<()> {
        if self.inner.config == *config {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "a handle for {} is already open, refusing to reopen as {}",
                self.inner.config.target(),
                config.target()
            )))
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.inner.config.dialect
    }

    pub(crate) fn series_table(&self) -> &str {
        self.inner.config.series_table()
    }

    // Gated plumbing shared by the reader and writer surfaces. The permit
    // spans the whole operation, connection wait included.

    pub(crate) async fn execute(&self, statement: &Statement) -> Result<u64> {
        let _slot = self.inner.gate.admit().await?;
        let mut guard = self.inner.conn.lock().await;
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        conn.execute(statement).await
    }

    pub(crate) async fn execute_transactional(&self, statements: &[Statement]) -> Result<u64> {
        let _slot = self.inner.gate.admit().await?;
        let mut guard = self.inner.conn.lock().await;
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        conn.execute_all(statements).await
    }

    pub(crate) async fn fetch_sensor_rows(&self, statement: &Statement) -> Result<Vec<SensorRow>> {
        let _slot = self.inner.gate.admit().await?;
        let mut guard = self.inner.conn.lock().await;
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        conn.fetch_sensor_rows(statement).await
    }
}

// The connection slot is omitted; DbConfig's Debug redacts the password.
impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
