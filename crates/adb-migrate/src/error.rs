//! Error types for the bootstrap coordinator.

use adb_core::CoreError;
use adb_db::DbError;
use thiserror::Error;

/// Bootstrap and migration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration or migration history error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database driver or lock error
    #[error(transparent)]
    Db(#[from] DbError),

    /// A migration script failed; its transaction was rolled back (M001).
    #[error("[M001] Migration to revision '{revision}' failed: {source}")]
    ScriptFailed {
        revision: String,
        #[source]
        source: DbError,
    },

    /// The base schema could not be created (M002).
    #[error("[M002] Schema creation failed: {0}")]
    SchemaCreateFailed(#[source] DbError),

    /// The version table does not hold the expected revision after an upgrade (M003).
    #[error("[M003] Upgrade ended at revision {actual}, expected '{expected}'")]
    RevisionMismatch { expected: String, actual: String },

    /// The version table holds more than one row (M004).
    #[error("[M004] Version table {table} holds {count} revisions; expected at most one")]
    MultipleCurrentRevisions { table: String, count: usize },

    /// A fresh schema is always created at head (M005).
    #[error("[M005] A fresh schema can only be created at head '{head}', not '{target}'")]
    TargetNotHead { target: String, head: String },

    /// The operation needs an initialized schema (M006).
    #[error("[M006] Database schema '{schema}' is not initialized")]
    NotInitialized { schema: String },

    /// The seed hook failed; the enclosing transaction was rolled back (M007).
    #[error("[M007] Seed population '{hook}' failed: {source}")]
    SeedFailed {
        hook: String,
        #[source]
        source: DbError,
    },
}

impl MigrateError {
    /// Whether this error is an ambiguous migration history (zero or
    /// several heads), which must stop the process at startup.
    pub fn is_fatal_history(&self) -> bool {
        matches!(self, MigrateError::Core(e) if e.is_fatal_history())
    }
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
