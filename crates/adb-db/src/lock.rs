//! Advisory locks held on a dedicated connection.

use crate::error::DbResult;
use async_trait::async_trait;
use std::fmt;

/// Key of a server-side advisory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(pub i64);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LockId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Backend side of a granted lock.
///
/// Dropping the guard must close whatever connection holds the lock, so the
/// server frees it even when [`unlock`](LockGuard::unlock) was never reached.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Ask the server to release the lock
    async fn unlock(&mut self, lock_id: LockId) -> DbResult<()>;
}

/// A granted advisory lock.
///
/// Call [`release`](Self::release) on every exit path. If the value is dropped
/// instead (panic, task cancelled, process killed) the dedicated connection
/// closes and the server releases the lock on its own.
pub struct AdvisoryLock {
    id: LockId,
    guard: Option<Box<dyn LockGuard>>,
}

impl AdvisoryLock {
    /// Wrap a backend guard for lock `id`.
    pub fn new(id: LockId, guard: Box<dyn LockGuard>) -> Self {
        Self {
            id,
            guard: Some(guard),
        }
    }

    /// Lock key
    pub fn id(&self) -> LockId {
        self.id
    }

    /// Release the lock and close its connection.
    ///
    /// Never fails: an unlock error (connection already gone, lock not held)
    /// is logged and ignored so it cannot mask the caller's own result.
    pub async fn release(mut self) {
        if let Some(mut guard) = self.guard.take() {
            if let Err(e) = guard.unlock(self.id).await {
                log::warn!("Ignoring failure to release advisory lock {}: {}", self.id, e);
            } else {
                log::debug!("Released advisory lock {}", self.id);
            }
        }
    }
}

impl fmt::Debug for AdvisoryLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisoryLock")
            .field("id", &self.id)
            .field("held", &self.guard.is_some())
            .finish()
    }
}
