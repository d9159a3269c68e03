//! Cache trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use crate::domain::DomainError;

/// Capability over the shared key-value cache
///
/// Values are JSON strings so the trait stays dyn-compatible; typed access
/// goes through the envelope codec. No retries happen at this layer: backend failures are
/// returned as `DomainError::StoreUnavailable`.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw value, `None` if the key is absent or physically expired
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value; `ttl = None` keeps the entry until overwritten or deleted
    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError>;

    /// Atomically sets a value only if the key does not exist
    ///
    /// Returns `true` when this call created the entry.
    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, DomainError>;

    /// Deletes a key, returning whether it existed. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Gets the remaining physical TTL; `None` when absent or persistent
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;
}
