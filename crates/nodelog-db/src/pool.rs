//! Connection pool creation.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Connection settings for the event database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    /// Path to the SQLite file, or `:memory:` for a private database held by
    /// a single pooled connection.
    pub path: String,

    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    pub pool_max_size: u32,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            path: "nodelog.db".to_string(),
            busy_timeout_ms: 5_000,
            pool_max_size: 4,
        }
    }
}

const IN_MEMORY: &str = ":memory:";

/// A pooled SQLite handle.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors raised while opening the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// r2d2 could not build the pool or open its first connection.
    #[error("failed to open event database pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a connection pool over `settings.path`.
///
/// Every connection is switched to WAL journaling (in-memory databases keep
/// `memory`) and gets the configured busy timeout. An in-memory database
/// exists per connection, so its pool is capped at one connection.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the pool cannot be built.
pub fn create_pool(settings: &DbSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let busy_timeout_ms = settings.busy_timeout_ms;

    let manager = SqliteConnectionManager::file(&settings.path)
        .with_flags(flags)
        .with_init(move |conn| {
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("journal mode stuck at {journal_mode}")),
                ));
            }
            conn.execute_batch(&format!("PRAGMA busy_timeout = {busy_timeout_ms};"))
        });

    let max_size = if settings.path == IN_MEMORY {
        1
    } else {
        settings.pool_max_size
    };

    let pool = Pool::builder().max_size(max_size).build(manager)?;

    tracing::debug!(
        path = %settings.path,
        max_size,
        "opened event database pool"
    );

    Ok(pool)
}
