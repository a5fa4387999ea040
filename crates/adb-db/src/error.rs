//! Error types for adb-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Advisory lock could not be acquired (D003)
    #[error("[D003] Advisory lock {lock_id} could not be acquired: {message}")]
    LockError { lock_id: i64, message: String },

    /// Transaction control failed (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            DbError::ConnectionError(err.to_string())
        } else {
            // the Display impl hides the server message behind "db error"
            match err.as_db_error() {
                Some(db_err) => DbError::ExecutionError(db_err.to_string()),
                None => DbError::ExecutionError(err.to_string()),
            }
        }
    }
}
