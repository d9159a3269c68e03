//! Self-expiring distributed lock built on set-if-absent

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Best-effort mutual exclusion over a shared cache
///
/// A lock is a key whose presence means "a rebuild is in progress". It carries
/// its own TTL so a crashed holder cannot wedge the key; a slow holder may
/// therefore lose the lock before it finishes.
#[derive(Debug, Clone)]
pub struct DistributedLock {
    cache: Arc<dyn Cache>,
}

impl DistributedLock {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Attempts to take the lock for `ttl`
    ///
    /// Returns a guard when this caller now owns the lock, `None` if someone
    /// else holds it.
    pub async fn try_acquire(
        &self,
        lock_key: &str,
        ttl: Duration,
    ) -> Result<Option<LockGuard>, DomainError> {
        let token = Uuid::new_v4().to_string();

        if !self.cache.set_nx_raw(lock_key, &token, ttl).await? {
            tracing::debug!(lock_key, "Lock held by another caller");
            return Ok(None);
        }

        tracing::debug!(lock_key, token = %token, ttl_ms = ttl.as_millis() as u64, "Lock acquired");

        Ok(Some(LockGuard {
            cache: self.cache.clone(),
            key: lock_key.to_string(),
            token,
            released: false,
        }))
    }

    /// Unconditionally deletes the lock key
    ///
    /// Releasing a lock that expired or was never taken is a no-op.
    pub async fn release(&self, lock_key: &str) -> Result<(), DomainError> {
        let existed = self.cache.delete(lock_key).await?;
        tracing::debug!(lock_key, existed, "Lock released");
        Ok(())
    }
}

/// Ownership of an acquired lock
///
/// Call [`LockGuard::release`] on every normal exit path. If the guard is
/// dropped without it (panic, cancelled future) the delete is spawned onto
/// the current tokio runtime; outside a runtime the lock is left to its TTL.
pub struct LockGuard {
    cache: Arc<dyn Cache>,
    key: String,
    token: String,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Random value written into the lock entry, useful when tracing holders
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Deletes the lock key. Consumes the guard so release happens once.
    pub async fn release(mut self) -> Result<(), DomainError> {
        self.released = true;
        let existed = self.cache.delete(&self.key).await?;

        if !existed {
            tracing::debug!(lock_key = %self.key, "Lock had already expired before release");
        }

        Ok(())
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let key = std::mem::take(&mut self.key);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let cache = self.cache.clone();
                handle.spawn(async move {
                    if let Err(e) = cache.delete(&key).await {
                        tracing::warn!(lock_key = %key, error = %e, "Failed to release dropped lock");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock_key = %key, "Lock dropped outside a runtime, left to expire");
            }
        }
    }
}
