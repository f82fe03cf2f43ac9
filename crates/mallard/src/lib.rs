//! Forward-only schema migration runner for DuckDB.
//!
//! Applies an ordered set of one-time schema changes exactly once each,
//! records them in a `_migrations` table, and rolls back any migration that
//! fails so the database is left unchanged.
//!
//! Migrations are plain `{id, procedure}` values built by the caller, whether
//! from a static registry, embedded SQL files, or anything else that yields a
//! `Vec<Migration>`. The engine borrows the connection and never opens or
//! closes it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mallard::{Migration, Migrator};
//!
//! let conn = duckdb::Connection::open("app.duckdb")?;
//!
//! let migrations = vec![
//!     Migration::from_sql(
//!         "20240320000001",
//!         include_str!("../migrations/20240320000001_create_users.sql"),
//!     ),
//!     Migration::new("20240320000002", |conn| {
//!         conn.execute_batch("ALTER TABLE users ADD COLUMN email TEXT;")
//!     }),
//! ];
//!
//! let applied = Migrator::new(&conn).run(&migrations)?;
//! ```
//!
//! A failed run is fatal to startup by design: schema state may not match
//! what the code expects. Re-running after a fix skips everything already
//! committed.

pub mod error;
pub mod migration;
pub mod runner;

pub use error::{MigrateError, MigrateResult};
pub use migration::{BoxError, Migration};
pub use runner::{validate_order, AppliedMigration, Migrator};
