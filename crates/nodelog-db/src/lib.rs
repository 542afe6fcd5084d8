//! SQLite storage for the nodelog event collection.
//!
//! Provides an `r2d2` connection pool with WAL-mode initialization and the
//! embedded migrations that create the `events` table. The store crate
//! builds its append and query operations on top of this.
//!
//! The pool is opened from a single path, the store's "connection string".
//! `:memory:` gives a throwaway database for tests.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbSettings, PoolError};
