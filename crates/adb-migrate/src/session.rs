//! Transactions opened under an advisory lock.

use crate::error::MigrateResult;
use adb_core::SchemaRevision;
use adb_db::{AdvisoryLock, Connection, Database, LockId};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Kind of change committed by a bootstrap session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    SchemaCreated,
    Migrated,
    Stamped,
    Seeded,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::SchemaCreated => write!(f, "schema created"),
            ChangeKind::Migrated => write!(f, "migrated"),
            ChangeKind::Stamped => write!(f, "stamped"),
            ChangeKind::Seeded => write!(f, "seeded"),
        }
    }
}

/// A change that has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub kind: ChangeKind,
    /// Revision recorded by the change, if it moved the schema
    pub revision: Option<SchemaRevision>,
    /// Lock held while the change was made
    pub lock_id: LockId,
    pub committed_at: DateTime<Utc>,
}

/// Observer notified after a session commits real changes.
///
/// Writes made inside a session are invisible to listeners until the
/// transaction commits; a rolled back session notifies nobody.
pub trait ChangeListener: Send + Sync {
    fn on_commit(&self, event: &CommitEvent);
}

/// Listener that logs every committed change.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl ChangeListener for LoggingListener {
    fn on_commit(&self, event: &CommitEvent) {
        match &event.revision {
            Some(rev) => log::info!("Committed: {} at revision {} (lock {})", event.kind, rev, event.lock_id),
            None => log::info!("Committed: {} (lock {})", event.kind, event.lock_id),
        }
    }
}

/// A connection inside an explicit transaction, tied to a held lock.
///
/// Taking `&AdvisoryLock` in [`begin`](Self::begin) means a session cannot
/// exist without its lock having been granted first. Dropping a session
/// without committing closes the connection, which rolls the transaction
/// back on the server.
pub struct BootstrapSession {
    conn: Box<dyn Connection>,
    lock_id: LockId,
    pending: Vec<(ChangeKind, Option<SchemaRevision>)>,
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl BootstrapSession {
    /// Open a fresh connection and begin a transaction on it.
    pub async fn begin(
        db: &dyn Database,
        lock: &AdvisoryLock,
        listeners: &[Arc<dyn ChangeListener>],
    ) -> MigrateResult<Self> {
        let mut conn = db.connect().await?;
        conn.begin().await?;
        Ok(Self {
            conn,
            lock_id: lock.id(),
            pending: Vec::new(),
            listeners: listeners.to_vec(),
        })
    }

    /// Connection carrying the transaction
    pub fn conn(&mut self) -> &mut dyn Connection {
        self.conn.as_mut()
    }

    /// Record that this session changed the database.
    pub fn mark_changed(&mut self, kind: ChangeKind, revision: Option<SchemaRevision>) {
        self.pending.push((kind, revision));
    }

    /// Whether anything was marked changed
    pub fn is_changed(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Commit, then notify listeners of every marked change.
    pub async fn commit(mut self) -> MigrateResult<Vec<CommitEvent>> {
        self.conn.commit().await?;

        let committed_at = Utc::now();
        let events: Vec<CommitEvent> = self
            .pending
            .drain(..)
            .map(|(kind, revision)| CommitEvent {
                kind,
                revision,
                lock_id: self.lock_id,
                committed_at,
            })
            .collect();

        for event in &events {
            for listener in &self.listeners {
                listener.on_commit(event);
            }
        }
        Ok(events)
    }

    /// Roll back; a failure here is logged, never returned.
    pub async fn rollback(mut self) {
        if let Err(e) = self.conn.rollback().await {
            log::warn!("Rollback under lock {} failed: {}", self.lock_id, e);
        }
    }

    /// Commit on success and roll back on error, passing `result` through.
    pub async fn finish<T>(self, result: MigrateResult<T>) -> MigrateResult<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                log::debug!("Rolling back work under lock {}: {}", self.lock_id, e);
                self.rollback().await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
