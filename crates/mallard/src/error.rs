//! Error types for mallard.

use crate::migration::BoxError;
use thiserror::Error;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Record table could not be created or verified (MIG001).
    #[error("[MIG001] Migration table initialization failed: {0}")]
    TableInit(String),

    /// Applied-set or history read failed (MIG002).
    #[error("[MIG002] Failed to read applied migrations: {0}")]
    AppliedRead(String),

    /// New migration id(s) sort before the latest applied id (MIG003).
    #[error("[MIG003] New migration(s) [{}] sort before latest applied {latest}", .ids.join(", "))]
    OrderViolation {
        /// Greatest id currently in the record table.
        latest: String,
        /// Offending candidate ids, ascending.
        ids: Vec<String>,
    },

    /// The same id appears twice in one batch (MIG004).
    #[error("[MIG004] Duplicate migration id in batch: {id}")]
    DuplicateId { id: String },

    /// A migration procedure or its record insert failed; the transaction
    /// was rolled back (MIG005).
    #[error("[MIG005] Migration {id} failed: {source}")]
    ApplyFailed {
        id: String,
        #[source]
        source: BoxError,
    },

    /// Transaction boundary statement failed (MIG006).
    #[error("[MIG006] Transaction control failed: {0}")]
    Transaction(String),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
