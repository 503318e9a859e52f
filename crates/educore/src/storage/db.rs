use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, DatabaseName};

use super::migrations::run_migrations;
use crate::error::{AppError, AppResult, BoxError};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Maximum number of pooled connections for a file-backed store.
const MAX_POOL_SIZE: u32 = 10;

/// How long a writer waits for another writer's transaction to finish.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a caller waits for a pooled connection before giving up.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the bot's SQLite database.
///
/// Cheap to clone; every clone shares one connection pool. A `Store` is only
/// ever handed out after the schema has been migrated.
#[derive(Clone)]
pub struct Store {
    pool: Arc<DbPool>,
    location: Arc<str>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("location", &self.location).finish()
    }
}

impl Store {
    /// Opens (creating if absent) the database file and migrates it.
    ///
    /// # Errors
    ///
    /// `AppError::StorageInit` when the file or its directory cannot be
    /// created, the database is read-only, or a migration fails. Callers must
    /// not serve traffic in that case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use educore::Store;
    ///
    /// let store = Store::initialize("education_full.db")?;
    /// # Ok::<(), educore::AppError>(())
    /// ```
    pub fn initialize(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let location: Arc<str> = Arc::from(path.display().to_string());
        let init_err = |source: BoxError| AppError::StorageInit {
            path: location.to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| init_err(e.into()))?;
        }

        // r2d2 retries a failing open until its timeout; surface the error now
        let first = Connection::open(path).map_err(|e| init_err(e.into()))?;
        first
            .query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| init_err(e.into()))?;
        drop(first);

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
            configure_connection(conn)
        });
        let pool = Pool::builder()
            .max_size(MAX_POOL_SIZE)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|e| init_err(e.into()))?;

        let store = Self {
            pool: Arc::new(pool),
            location: Arc::clone(&location),
        };

        let conn = store.conn().map_err(|e| init_err(e.into()))?;
        if conn.is_readonly(DatabaseName::Main).map_err(|e| init_err(e.into()))? {
            return Err(init_err(format!("{} is read-only", location).into()));
        }
        drop(conn);

        let applied = store.migrate()?;
        log::info!("Database ready at {} ({} migration(s) applied)", location, applied);

        Ok(store)
    }

    /// Private in-memory database, migrated. Used by tests.
    ///
    /// The pool holds a single connection that is never recycled, so every
    /// caller sees the same database for the life of the store.
    pub fn in_memory() -> AppResult<Self> {
        let location: Arc<str> = Arc::from(":memory:");
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(|e| AppError::StorageInit {
                path: location.to_string(),
                source: e.into(),
            })?;

        let store = Self {
            pool: Arc::new(pool),
            location,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Brings the schema up to date. Returns the number of migrations applied.
    ///
    /// Idempotent: once the schema is current a call applies nothing.
    pub fn migrate(&self) -> AppResult<usize> {
        let mut conn = self.conn().map_err(|e| AppError::StorageInit {
            path: self.location.to_string(),
            source: e.into(),
        })?;

        run_migrations(&mut conn).map_err(|e| AppError::StorageInit {
            path: self.location.to_string(),
            source: e.into(),
        })
    }

    /// The schema as SQLite reports it, ordered by object name.
    ///
    /// Two stores with equal fingerprints have identical tables and indexes.
    pub fn schema_fingerprint(&self) -> AppResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT type || ' ' || name || ': ' || COALESCE(sql, '') FROM sqlite_master
             WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut fingerprint = Vec::new();
        for row in rows {
            fingerprint.push(row?);
        }
        Ok(fingerprint)
    }

    /// Number of rows in `refinery_schema_history`.
    pub fn applied_migration_count(&self) -> AppResult<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |row| row.get(0))?)
    }

    /// Where this store lives (a file path or `:memory:`).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Get a connection from the pool
    ///
    /// The connection is returned to the pool when dropped.
    pub(crate) fn conn(&self) -> AppResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")
}
