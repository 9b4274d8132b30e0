#![forbid(unsafe_code)]

mod config;
mod error;
mod jobs;
mod query;

pub use config::StoreConfig;
pub use error::StoreError;
pub use query::{JobFilter, ParentFilter};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;

const SCHEMA_VERSION: i64 = 1;

/// Job store backed by a single SQLite file.
///
/// One handle per data directory: the store does no locking of its own
/// beyond SQLite's busy timeout. Call [`SqliteStore::close`] (or use
/// [`SqliteStore::with_store`]) when done.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Option<Connection>,
    storage_dir: PathBuf,
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(StoreConfig::new(storage_dir))
    }

    pub fn open_with(config: StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.storage_dir)?;

        let db_path = config.db_path();
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(config.busy_timeout)?;
        install_schema(&conn)?;

        info!(path = %db_path.display(), "job store opened");
        Ok(Self {
            conn: Some(conn),
            storage_dir: config.storage_dir,
            db_path,
        })
    }

    /// Opens a store, hands it to `f`, and closes it again whatever `f`
    /// returns. A close failure is only reported when `f` succeeded.
    pub fn with_store<T, E, F>(config: StoreConfig, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut SqliteStore) -> Result<T, E>,
    {
        let mut store = Self::open_with(config)?;
        let result = f(&mut store);
        let closed = store.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Releases the connection. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), StoreError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| StoreError::Sql(err))?;
        info!(path = %self.db_path.display(), "job store closed");
        Ok(())
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    // journal_mode answers with a row, so it cannot go through execute_batch.
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
          id TEXT PRIMARY KEY,
          data TEXT NOT NULL
        );
        "#,
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
