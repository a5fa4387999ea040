//! PostgreSQL database backend implementation
//!
//! Advisory locks use `pg_advisory_lock`, a session-level lock, taken on a
//! connection opened just for the lock. If the holder crashes or its socket
//! drops, the server frees the lock with the session.

use crate::error::{DbError, DbResult};
use crate::lock::{AdvisoryLock, LockGuard, LockId};
use crate::traits::{Connection, Database};
use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

/// PostgreSQL database backend
pub struct PostgresBackend {
    config: tokio_postgres::Config,
}

impl PostgresBackend {
    /// Create a backend from a connection string
    ///
    /// No connection is opened until one is needed.
    pub fn new(url: &str) -> DbResult<Self> {
        let config = url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbError::ConnectionError(format!("invalid connection string: {e}")))?;
        Ok(Self { config })
    }

    async fn open(&self) -> DbResult<Client> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        // The connection future resolves once the client is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::warn!("PostgreSQL connection closed with error: {e}");
            }
        });
        Ok(client)
    }
}

#[async_trait]
impl Database for PostgresBackend {
    async fn connect(&self) -> DbResult<Box<dyn Connection>> {
        Ok(Box::new(PostgresConnection {
            client: self.open().await?,
        }))
    }

    async fn lock(&self, lock_id: LockId) -> DbResult<AdvisoryLock> {
        let lock_error = |message: String| DbError::LockError {
            lock_id: lock_id.0,
            message,
        };

        let client = self.open().await.map_err(|e| lock_error(e.to_string()))?;
        log::debug!("Waiting for advisory lock {lock_id}");
        client
            .execute("SELECT pg_advisory_lock($1)", &[&lock_id.0])
            .await
            .map_err(|e| lock_error(DbError::from(e).to_string()))?;
        log::debug!("Acquired advisory lock {lock_id}");

        Ok(AdvisoryLock::new(
            lock_id,
            Box::new(PostgresLockGuard {
                client: Some(client),
            }),
        ))
    }

    fn default_schema(&self) -> &'static str {
        "public"
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }
}

struct PostgresLockGuard {
    client: Option<Client>,
}

#[async_trait]
impl LockGuard for PostgresLockGuard {
    async fn unlock(&mut self, lock_id: LockId) -> DbResult<()> {
        // Dropping the client at the end of this scope closes the session.
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        let released: bool = client
            .query_one("SELECT pg_advisory_unlock($1)", &[&lock_id.0])
            .await?
            .try_get(0)?;
        if !released {
            log::warn!("Advisory lock {lock_id} was not held by its session");
        }
        Ok(())
    }
}

/// A session on a PostgreSQL server
pub struct PostgresConnection {
    client: Client,
}

fn sql_params<'a>(params: &'a [&'a str]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<u64> {
        Ok(self.client.execute(sql, &sql_params(params)).await?)
    }

    async fn query_i64(&mut self, sql: &str, params: &[&str]) -> DbResult<i64> {
        let row = self.client.query_one(sql, &sql_params(params)).await?;
        Ok(row.try_get::<_, i64>(0)?)
    }

    async fn query_strings(&mut self, sql: &str, params: &[&str]) -> DbResult<Vec<String>> {
        let rows = self.client.query(sql, &sql_params(params)).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DbError::from))
            .collect()
    }
}
