//! DuckDB database backend implementation
//!
//! DuckDB is embedded and has no advisory locks of its own. The backend keeps
//! a lock table next to its root connection instead: every connection and
//! lock handed out by one [`DuckDbBackend`] shares both, which is the unit of
//! mutual exclusion. This makes the backend suitable for single-host setups
//! and for exercising the bootstrap protocol in tests; multi-process
//! deployments use PostgreSQL.

use crate::error::{DbError, DbResult};
use crate::lock::{AdvisoryLock, LockGuard, LockId};
use crate::traits::{Connection, Database};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type LockSlot = Arc<tokio::sync::Mutex<()>>;

/// DuckDB database backend
pub struct DuckDbBackend {
    root: Mutex<duckdb::Connection>,
    locks: Mutex<HashMap<LockId, LockSlot>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB database
    pub fn in_memory() -> DbResult<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_root(conn))
    }

    /// Open (or create) a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = duckdb::Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::with_root(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_root(root: duckdb::Connection) -> Self {
        Self {
            root: Mutex::new(root),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn clone_root(&self) -> DbResult<duckdb::Connection> {
        let root = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        root.try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))
    }

    fn lock_slot(&self, lock_id: LockId) -> DbResult<LockSlot> {
        let mut table = self
            .locks
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(Arc::clone(table.entry(lock_id).or_default()))
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn connect(&self) -> DbResult<Box<dyn Connection>> {
        Ok(Box::new(DuckDbConnection {
            conn: self.clone_root()?,
        }))
    }

    async fn lock(&self, lock_id: LockId) -> DbResult<AdvisoryLock> {
        let slot = self.lock_slot(lock_id)?;
        log::debug!("Waiting for advisory lock {lock_id}");
        let held = slot.lock_owned().await;
        log::debug!("Acquired advisory lock {lock_id}");
        Ok(AdvisoryLock::new(
            lock_id,
            Box::new(DuckDbLockGuard { held: Some(held) }),
        ))
    }

    fn default_schema(&self) -> &'static str {
        "main"
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

struct DuckDbLockGuard {
    held: Option<OwnedMutexGuard<()>>,
}

#[async_trait]
impl LockGuard for DuckDbLockGuard {
    async fn unlock(&mut self, _lock_id: LockId) -> DbResult<()> {
        self.held.take();
        Ok(())
    }
}

/// A session on a [`DuckDbBackend`] database
pub struct DuckDbConnection {
    conn: duckdb::Connection,
}

#[async_trait]
impl Connection for DuckDbConnection {
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<u64> {
        let affected = self
            .conn
            .execute(sql, duckdb::params_from_iter(params.iter().copied()))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(affected as u64)
    }

    async fn query_i64(&mut self, sql: &str, params: &[&str]) -> DbResult<i64> {
        self.conn
            .query_row(
                sql,
                duckdb::params_from_iter(params.iter().copied()),
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(duckdb::params_from_iter(params.iter().copied()), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
