//! Cache-aside client
//!
//! Serves reads from the shared cache and shields the backing store with
//! three strategies:
//! - pass-through: negative caching of confirmed-absent keys;
//! - mutex: only the holder of a per-key lock reloads, others wait and re-read;
//! - logical expiry: stale entries are served while a background task refreshes them.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::DomainError;
use crate::domain::cache::{
    Cache, CacheKey, CachedValue, Loader, LogicalEnvelope, NEGATIVE_MARKER, ReadStrategy,
    decode_logical, decode_plain, encode_logical, encode_plain,
};
use crate::infrastructure::cache::{DistributedLock, RebuildScheduler};
use crate::infrastructure::observability::{
    ReadOutcome, record_decode_error, record_lock_contended, record_read,
};

/// What a mutex-guarded read returns once its retry budget is spent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContendedPolicy {
    /// Fail with `DomainError::Contended`
    #[default]
    Error,
    /// Report the key as not found
    NotFound,
}

/// Configuration for the cache-aside client
#[derive(Debug, Clone)]
pub struct CacheAsideConfig {
    /// TTL of negative cache entries
    pub null_ttl: Duration,
    /// TTL of the rebuild lock
    pub lock_ttl: Duration,
    /// Wait between attempts when the rebuild lock is held elsewhere
    pub retry_backoff: Duration,
    /// Retries after the first attempt before giving up
    pub max_retries: u32,
    pub contended_policy: ContendedPolicy,
}

impl Default for CacheAsideConfig {
    fn default() -> Self {
        Self {
            null_ttl: Duration::from_secs(120),
            lock_ttl: Duration::from_secs(10),
            retry_backoff: Duration::from_millis(50),
            max_retries: 100,
            contended_policy: ContendedPolicy::Error,
        }
    }
}

impl CacheAsideConfig {
    pub fn with_null_ttl(mut self, ttl: Duration) -> Self {
        self.null_ttl = ttl;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_contended_policy(mut self, policy: ContendedPolicy) -> Self {
        self.contended_policy = policy;
        self
    }

    /// Upper bound on the time a mutex-guarded read spends waiting for the lock
    pub fn max_wait(&self) -> Duration {
        self.retry_backoff.saturating_mul(self.max_retries)
    }
}

/// Entity-agnostic cache-aside client
///
/// Callers supply a key prefix, an identifier and a `Loader` for the backing
/// store; `Ok(None)` means the record does not exist.
#[derive(Debug, Clone)]
pub struct CacheAsideClient {
    cache: Arc<dyn Cache>,
    lock: DistributedLock,
    scheduler: Arc<RebuildScheduler>,
    config: CacheAsideConfig,
}

impl CacheAsideClient {
    pub fn new(cache: Arc<dyn Cache>, scheduler: Arc<RebuildScheduler>) -> Self {
        Self::with_config(cache, scheduler, CacheAsideConfig::default())
    }

    pub fn with_config(
        cache: Arc<dyn Cache>,
        scheduler: Arc<RebuildScheduler>,
        config: CacheAsideConfig,
    ) -> Self {
        Self {
            lock: DistributedLock::new(cache.clone()),
            cache,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &CacheAsideConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<RebuildScheduler> {
        &self.scheduler
    }

    /// Writes a plain entry with a physical TTL
    pub async fn write<V>(
        &self,
        prefix: &str,
        id: impl Display,
        value: &V,
        ttl: Duration,
    ) -> Result<(), DomainError>
    where
        V: Serialize + ?Sized,
    {
        let key = CacheKey::new(prefix, id);
        let raw = encode_plain(value)?;
        self.cache.set_raw(key.as_str(), &raw, Some(ttl)).await
    }

    /// Writes a logical-expiry envelope with no physical TTL
    pub async fn write_logical<V>(
        &self,
        prefix: &str,
        id: impl Display,
        value: &V,
        logical_ttl: Duration,
    ) -> Result<(), DomainError>
    where
        V: Serialize,
    {
        let key = CacheKey::new(prefix, id);
        let envelope = LogicalEnvelope::new(value, logical_ttl);
        let raw = encode_logical(&envelope)?;

        self.cache.set_raw(key.as_str(), &raw, None).await?;

        tracing::debug!(
            key = %key,
            logical_expire_at = %envelope.logical_expire_at,
            "Logical entry written"
        );
        Ok(())
    }

    /// Deletes the entry so the next read reloads it
    pub async fn invalidate(&self, prefix: &str, id: impl Display) -> Result<bool, DomainError> {
        let key = CacheKey::new(prefix, id);
        let existed = self.cache.delete(key.as_str()).await?;

        tracing::debug!(key = %key, existed, "Cache entry invalidated");
        Ok(existed)
    }

    /// Reads with the given strategy
    pub async fn read<ID, V, L>(
        &self,
        strategy: ReadStrategy,
        prefix: &str,
        id: ID,
        loader: Arc<L>,
        ttl: Duration,
    ) -> Result<Option<V>, DomainError>
    where
        ID: Display + Send + Sync + 'static,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
        L: Loader<ID, V> + ?Sized + 'static,
    {
        match strategy {
            ReadStrategy::PassThrough => {
                self.read_pass_through(prefix, &id, loader.as_ref(), ttl)
                    .await
            }
            ReadStrategy::Mutex => self.read_with_mutex(prefix, &id, loader.as_ref(), ttl).await,
            ReadStrategy::LogicalExpire => {
                self.read_with_logical_expire(prefix, id, loader, ttl)
                    .await
            }
        }
    }

    /// Pass-through read with negative caching
    ///
    /// Concurrent misses may all reach the loader.
    pub async fn read_pass_through<ID, V, L>(
        &self,
        prefix: &str,
        id: &ID,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>, DomainError>
    where
        ID: Display + Send + Sync,
        V: Serialize + DeserializeOwned + Send,
        L: Loader<ID, V> + ?Sized,
    {
        let strategy = ReadStrategy::PassThrough;
        let key = CacheKey::new(prefix, id);

        if let Some(cached) = self.lookup_plain::<V>(strategy, &key).await? {
            return Ok(served(strategy, &key, cached));
        }

        tracing::debug!(key = %key, "Cache miss, loading from backing store");
        self.load_and_fill(strategy, &key, id, loader, ttl).await
    }

    /// Mutex-guarded read
    ///
    /// On a miss only the caller holding `lock:<key>` loads; the others sleep
    /// `retry_backoff` and re-read, at most `max_retries` times.
    pub async fn read_with_mutex<ID, V, L>(
        &self,
        prefix: &str,
        id: &ID,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>, DomainError>
    where
        ID: Display + Send + Sync,
        V: Serialize + DeserializeOwned + Send,
        L: Loader<ID, V> + ?Sized,
    {
        let strategy = ReadStrategy::Mutex;
        let key = CacheKey::new(prefix, id);
        let lock_key = key.lock_key();

        for attempt in 0..=self.config.max_retries {
            if let Some(cached) = self.lookup_plain::<V>(strategy, &key).await? {
                return Ok(served(strategy, &key, cached));
            }

            let Some(guard) = self
                .lock
                .try_acquire(&lock_key, self.config.lock_ttl)
                .await?
            else {
                record_lock_contended(strategy);
                tracing::debug!(key = %key, attempt, "Rebuild lock held elsewhere, backing off");

                if attempt < self.config.max_retries {
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                continue;
            };

            // The previous holder may have filled the entry between our lookup and acquire
            let result = match self.lookup_plain::<V>(strategy, &key).await {
                Ok(Some(cached)) => Ok(served(strategy, &key, cached)),
                Ok(None) => self.load_and_fill(strategy, &key, id, loader, ttl).await,
                Err(e) => Err(e),
            };

            if let Err(e) = guard.release().await {
                tracing::warn!(
                    lock_key = %lock_key,
                    error = %e,
                    "Failed to release rebuild lock, it will expire on its own"
                );
            }

            return result;
        }

        let attempts = self.config.max_retries + 1;
        record_read(strategy, ReadOutcome::Contended);
        tracing::warn!(key = %key, attempts, "Gave up waiting for rebuild lock");

        match self.config.contended_policy {
            ContendedPolicy::Error => Err(DomainError::contended(key.as_str(), attempts)),
            ContendedPolicy::NotFound => Ok(None),
        }
    }

    /// Logical-expiry read
    ///
    /// Never calls the loader on the caller's path. Entries must be
    /// pre-populated with `write_logical`; a missing entry is reported as not
    /// found. An expired entry is returned as-is after scheduling a rebuild.
    pub async fn read_with_logical_expire<ID, V, L>(
        &self,
        prefix: &str,
        id: ID,
        loader: Arc<L>,
        ttl: Duration,
    ) -> Result<Option<V>, DomainError>
    where
        ID: Display + Send + Sync + 'static,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
        L: Loader<ID, V> + ?Sized + 'static,
    {
        let strategy = ReadStrategy::LogicalExpire;
        let key = CacheKey::new(prefix, &id);

        let Some(raw) = self.cache.get_raw(key.as_str()).await? else {
            record_read(strategy, ReadOutcome::NotCached);
            tracing::debug!(key = %key, "No logical entry cached");
            return Ok(None);
        };

        if raw.trim().is_empty() {
            record_read(strategy, ReadOutcome::NotCached);
            tracing::debug!(key = %key, "Negative entry cached, record is absent");
            return Ok(None);
        }

        let envelope = match decode_logical::<V>(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                record_decode_error(strategy);
                tracing::warn!(key = %key, error = %e, "Corrupt logical entry, scheduling rebuild");
                self.schedule_rebuild::<ID, V, L>(&key, id, loader, ttl).await;
                record_read(strategy, ReadOutcome::NotCached);
                return Ok(None);
            }
        };

        if !envelope.is_expired() {
            record_read(strategy, ReadOutcome::Hit);
            return Ok(Some(envelope.data));
        }

        tracing::debug!(
            key = %key,
            logical_expire_at = %envelope.logical_expire_at,
            "Logical entry expired, serving stale data"
        );
        self.schedule_rebuild::<ID, V, L>(&key, id, loader, ttl).await;
        record_read(strategy, ReadOutcome::Stale);

        Ok(Some(envelope.data))
    }

    /// Looks up a plain entry; undecodable payloads are logged and treated as a miss
    async fn lookup_plain<V>(
        &self,
        strategy: ReadStrategy,
        key: &CacheKey,
    ) -> Result<Option<CachedValue<V>>, DomainError>
    where
        V: DeserializeOwned,
    {
        let Some(raw) = self.cache.get_raw(key.as_str()).await? else {
            return Ok(None);
        };

        match decode_plain(&raw) {
            Ok(cached) => Ok(Some(cached)),
            Err(e) => {
                record_decode_error(strategy);
                tracing::warn!(key = %key, error = %e, "Corrupt cache entry, treating as miss");
                Ok(None)
            }
        }
    }

    /// Calls the loader and caches either the value or a negative marker
    async fn load_and_fill<ID, V, L>(
        &self,
        strategy: ReadStrategy,
        key: &CacheKey,
        id: &ID,
        loader: &L,
        ttl: Duration,
    ) -> Result<Option<V>, DomainError>
    where
        ID: Send + Sync,
        V: Serialize + Send,
        L: Loader<ID, V> + ?Sized,
    {
        match loader.load(id).await? {
            Some(value) => {
                let raw = encode_plain(&value)?;
                self.cache.set_raw(key.as_str(), &raw, Some(ttl)).await?;

                record_read(strategy, ReadOutcome::Loaded);
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "Loaded and cached");
                Ok(Some(value))
            }
            None => {
                self.cache
                    .set_raw(key.as_str(), NEGATIVE_MARKER, Some(self.config.null_ttl))
                    .await?;

                record_read(strategy, ReadOutcome::Absent);
                tracing::debug!(key = %key, "Absent from backing store, negative entry cached");
                Ok(None)
            }
        }
    }

    /// Takes the rebuild lock and hands the refresh to the scheduler
    ///
    /// Failures here are logged only: the caller is about to return stale data.
    async fn schedule_rebuild<ID, V, L>(
        &self,
        key: &CacheKey,
        id: ID,
        loader: Arc<L>,
        ttl: Duration,
    ) where
        ID: Send + Sync + 'static,
        V: Serialize + Send + 'static,
        L: Loader<ID, V> + ?Sized + 'static,
    {
        let lock_key = key.lock_key();

        let guard = match self.lock.try_acquire(&lock_key, self.config.lock_ttl).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                record_lock_contended(ReadStrategy::LogicalExpire);
                tracing::debug!(key = %key, "Rebuild already in progress");
                return;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not take rebuild lock");
                return;
            }
        };

        let cache = self.cache.clone();
        let task_key = key.clone();

        let task = async move {
            let outcome =
                rebuild_logical::<ID, V, L>(cache.as_ref(), &task_key, &id, loader.as_ref(), ttl)
                    .await;
            let released = guard.release().await;

            outcome?;
            released
        };

        // A rejected task is dropped with its guard, which releases the lock
        if let Err(e) = self.scheduler.submit(format!("rebuild {}", key), task) {
            tracing::warn!(key = %key, error = %e, "Rebuild not scheduled, entry stays stale");
        }
    }
}

fn served<V>(strategy: ReadStrategy, key: &CacheKey, cached: CachedValue<V>) -> Option<V> {
    match cached {
        CachedValue::Hit(value) => {
            record_read(strategy, ReadOutcome::Hit);
            tracing::debug!(key = %key, "Cache hit");
            Some(value)
        }
        CachedValue::Negative => {
            record_read(strategy, ReadOutcome::NegativeHit);
            tracing::debug!(key = %key, "Negative cache hit");
            None
        }
    }
}

async fn rebuild_logical<ID, V, L>(
    cache: &dyn Cache,
    key: &CacheKey,
    id: &ID,
    loader: &L,
    ttl: Duration,
) -> Result<(), DomainError>
where
    ID: Send + Sync,
    V: Serialize + Send,
    L: Loader<ID, V> + ?Sized,
{
    match loader.load(id).await? {
        Some(value) => {
            let envelope = LogicalEnvelope::new(value, ttl);
            let raw = encode_logical(&envelope)?;
            cache.set_raw(key.as_str(), &raw, None).await?;

            tracing::info!(
                key = %key,
                logical_expire_at = %envelope.logical_expire_at,
                "Logical entry rebuilt"
            );
        }
        None => {
            cache.delete(key.as_str()).await?;
            tracing::info!(key = %key, "Record gone from backing store, logical entry removed");
        }
    }

    Ok(())
}
