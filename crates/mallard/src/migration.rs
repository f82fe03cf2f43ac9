//! Migration descriptor type.

use duckdb::Connection;
use std::fmt;

/// Error type migration procedures may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type RunFn = Box<dyn Fn(&Connection) -> Result<(), BoxError> + Send + Sync>;

/// A uniquely identified, one-time schema change.
///
/// Ids must sort lexicographically in the order the changes are meant to
/// run; zero-padded timestamps (`"20240320000001"`) keep string comparison
/// equal to chronological order.
pub struct Migration {
    id: String,
    run: RunFn,
}

impl Migration {
    /// Wrap an arbitrary procedure.
    ///
    /// The procedure receives the live connection inside an already-open
    /// transaction and must not issue `BEGIN`/`COMMIT`/`ROLLBACK` itself.
    pub fn new<F, E>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Connection) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Migration {
            id: id.into(),
            run: Box::new(move |conn| run(conn).map_err(Into::into)),
        }
    }

    /// Wrap an embedded SQL script (pairs well with `include_str!`).
    ///
    /// The script runs as one batch; statements are separated by `;`.
    pub fn from_sql(id: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self::new(id, move |conn: &Connection| conn.execute_batch(&sql))
    }

    /// The migration's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the procedure against `conn`.
    pub(crate) fn run(&self, conn: &Connection) -> Result<(), BoxError> {
        (self.run)(conn)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
