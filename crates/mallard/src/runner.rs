//! Migration engine over a borrowed DuckDB connection.
//!
//! Tracks applied migration ids in the `_migrations` table and applies any
//! unapplied migrations in ascending id order, one transaction each.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Migration;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use std::collections::HashSet;

/// One row of the `_migrations` record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// Migration id.
    pub id: String,
    /// When the row was inserted (UTC, second precision).
    pub applied_at: DateTime<Utc>,
}

/// Migration engine.
///
/// Borrows the connection for the duration of a run and never opens or
/// closes connections itself. Single-writer: exactly one `run` at a time
/// against a given database, with no other process inserting `_migrations`
/// rows.
pub struct Migrator<'c> {
    conn: &'c Connection,
}

impl<'c> Migrator<'c> {
    /// Create an engine over `conn`.
    pub fn new(conn: &'c Connection) -> Self {
        Migrator { conn }
    }

    /// Ensure the `_migrations` record table exists.
    ///
    /// Safe to call repeatedly; the table is never dropped by the engine.
    pub fn ensure_table(&self) -> MigrateResult<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS _migrations (
                     id         TEXT PRIMARY KEY,
                     applied_at TIMESTAMP DEFAULT now()
                 );",
            )
            .map_err(|e| MigrateError::TableInit(e.to_string()))
    }

    /// The set of migration ids already recorded as applied.
    ///
    /// Read fresh on every call; nothing is cached across invocations.
    /// Requires the record table to exist: [`Migrator::run`] calls
    /// [`Migrator::ensure_table`] first, standalone callers must do the same.
    pub fn applied_ids(&self) -> MigrateResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM _migrations")
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?;
        Ok(ids)
    }

    /// All applied migrations ordered by id, with their `applied_at` stamps.
    ///
    /// Read-only status view; the engine itself never consumes it.
    pub fn history(&self) -> MigrateResult<Vec<AppliedMigration>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, strftime(applied_at, '%Y-%m-%d %H:%M:%S')
                 FROM _migrations ORDER BY id",
            )
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrateError::AppliedRead(e.to_string()))?;

        rows.into_iter()
            .map(|(id, stamp)| {
                let applied_at = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S")
                    .map_err(|e| {
                        MigrateError::AppliedRead(format!("bad applied_at for {id}: {e}"))
                    })?
                    .and_utc();
                Ok(AppliedMigration { id, applied_at })
            })
            .collect()
    }

    /// Apply a single migration inside its own transaction and record it.
    ///
    /// The caller is responsible for having checked the applied-set:
    /// applying an already-recorded id fails on the primary key and rolls
    /// back, procedure effects included.
    pub fn apply(&self, migration: &Migration) -> MigrateResult<()> {
        log::info!("applying migration {}", migration.id());

        let result = self.transaction(|conn| {
            migration.run(conn).map_err(|e| MigrateError::ApplyFailed {
                id: migration.id().to_string(),
                source: e,
            })?;
            conn.execute(
                "INSERT INTO _migrations (id) VALUES (?)",
                duckdb::params![migration.id()],
            )
            .map_err(|e| MigrateError::ApplyFailed {
                id: migration.id().to_string(),
                source: Box::new(e),
            })?;
            Ok(())
        });

        match &result {
            Ok(()) => log::info!("applied migration {}", migration.id()),
            Err(e) => log::error!("migration {} failed: {e}", migration.id()),
        }
        result
    }

    /// Run all unapplied migrations from `migrations` in ascending id order.
    ///
    /// Ensures the record table exists, validates the batch against the
    /// applied-set, then applies each unapplied migration in its own
    /// transaction. Returns the number of migrations applied by this
    /// invocation.
    ///
    /// The first failure halts the run; migrations committed before it stay
    /// committed, and the error carries the failing id and cause.
    pub fn run(&self, migrations: &[Migration]) -> MigrateResult<usize> {
        self.ensure_table()?;
        let applied = self.applied_ids()?;

        check_duplicate_ids(migrations)?;
        validate_order(migrations, &applied)?;

        let mut ordered: Vec<&Migration> = migrations.iter().collect();
        ordered.sort_by(|a, b| a.id().cmp(b.id()));

        let mut count = 0;
        for migration in ordered {
            if applied.contains(migration.id()) {
                log::debug!("skipping already applied migration {}", migration.id());
                continue;
            }
            self.apply(migration)?;
            count += 1;
        }

        if count > 0 {
            log::info!("applied {count} migration(s)");
        }
        Ok(count)
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back
    /// on error.
    ///
    /// The explicit `BEGIN` matters: the driver does not auto-open a
    /// transaction on the first statement, so without it `ROLLBACK` would
    /// undo nothing.
    fn transaction<F, T>(&self, body: F) -> MigrateResult<T>
    where
        F: FnOnce(&Connection) -> MigrateResult<T>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MigrateError::Transaction(format!("BEGIN failed: {e}")))?;

        let result = body(self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(MigrateError::Transaction(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }
}

/// Reject candidate batches whose new ids sort before the latest applied id.
///
/// An empty applied-set accepts anything, since there is no baseline to
/// violate. Only drift relative to the single maximum is caught; pairwise
/// gaps among already-applied ids are not re-checked.
pub fn validate_order(migrations: &[Migration], applied: &HashSet<String>) -> MigrateResult<()> {
    let latest = match applied.iter().max() {
        Some(latest) => latest,
        None => return Ok(()),
    };

    let mut behind: Vec<String> = migrations
        .iter()
        .filter(|m| !applied.contains(m.id()) && m.id() < latest.as_str())
        .map(|m| m.id().to_string())
        .collect();

    if behind.is_empty() {
        Ok(())
    } else {
        behind.sort();
        Err(MigrateError::OrderViolation {
            latest: latest.clone(),
            ids: behind,
        })
    }
}

/// Reject batches containing the same id twice.
///
/// Without this check the second copy would fail mid-run on the record
/// table's primary key, after the first copy already committed.
fn check_duplicate_ids(migrations: &[Migration]) -> MigrateResult<()> {
    let mut seen = HashSet::new();
    for migration in migrations {
        if !seen.insert(migration.id()) {
            return Err(MigrateError::DuplicateId {
                id: migration.id().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
