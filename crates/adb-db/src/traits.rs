//! Database trait definitions

use crate::error::DbResult;
use crate::lock::{AdvisoryLock, LockId};
use async_trait::async_trait;

/// A database the bootstrap protocol can run against.
///
/// One handle is built at process start and shared by reference; it hands
/// out independent connections and advisory locks. Implementations must be
/// Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Open a new connection for inspection or protected work.
    ///
    /// Every call returns a connection with no open transaction, so a
    /// transaction begun on it sees everything committed before the call.
    async fn connect(&self) -> DbResult<Box<dyn Connection>>;

    /// Block until the advisory lock `lock_id` is granted.
    ///
    /// The lock is held on its own dedicated connection, never on one returned
    /// by [`connect`](Self::connect), and is released when that connection
    /// goes away.
    async fn lock(&self, lock_id: LockId) -> DbResult<AdvisoryLock>;

    /// Schema holding application tables when none is configured
    fn default_schema(&self) -> &'static str;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// A single database session.
///
/// Parameters are passed as strings and referenced as `$1`, `$2`, ... in SQL.
#[async_trait]
pub trait Connection: Send {
    /// Execute one or more statements without parameters
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()>;

    /// Execute a single statement, returning the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<u64>;

    /// Run a query returning exactly one row with one integer column
    async fn query_i64(&mut self, sql: &str, params: &[&str]) -> DbResult<i64>;

    /// Run a query and collect the first (text) column of every row
    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> DbResult<Vec<String>>;

    /// Start an explicit transaction
    async fn begin(&mut self) -> DbResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
            .await
            .map_err(|e| crate::DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    /// Commit the open transaction
    async fn commit(&mut self) -> DbResult<()> {
        self.execute_batch("COMMIT")
            .await
            .map_err(|e| crate::DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    /// Roll back the open transaction
    async fn rollback(&mut self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
            .await
            .map_err(|e| crate::DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}
