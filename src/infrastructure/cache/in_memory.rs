//! In-memory cache implementation using moka

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};

use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum number of entries
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    ttl: Option<Duration>,
    /// Expiration timestamp (millis since epoch), `None` for persistent entries
    expires_at: Option<u64>,
}

/// Per-entry expiration so TTL-less and short-lived entries can share one cache
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Thread-safe in-memory cache implementation using moka
///
/// Features:
/// - Optional TTL per entry (entries without TTL live until overwritten)
/// - Atomic set-if-absent through moka's entry compute API
/// - Size-bounded eviction when capacity is reached
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self { cache, config }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn new_entry(value: &str, ttl: Option<Duration>) -> CacheEntry {
        CacheEntry {
            data: value.to_string(),
            ttl,
            expires_at: ttl.map(|ttl| Self::current_time_millis() + ttl.as_millis() as u64),
        }
    }

    fn is_expired(entry: &CacheEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| Self::current_time_millis() >= expires_at)
    }

    /// Hides expired entries without removing them; eviction is left to moka
    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        self.cache
            .get(key)
            .await
            .filter(|entry| !Self::is_expired(entry))
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        self.cache
            .insert(key.to_string(), Self::new_entry(value, ttl))
            .await;
        Ok(())
    }

    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let candidate = Self::new_entry(value, Some(ttl));

        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(current) if !Self::is_expired(current.value()) => Op::Nop,
                    _ => Op::Put(candidate),
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let removed = self.cache.remove(key).await;
        Ok(removed.is_some_and(|entry| !Self::is_expired(&entry)))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let Some(entry) = self.live_entry(key).await else {
            return Ok(None);
        };

        Ok(entry.expires_at.map(|expires_at| {
            Duration::from_millis(expires_at.saturating_sub(Self::current_time_millis()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "\"value1\"", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let result = cache.get_raw("key1").await.unwrap();
        assert_eq!(result, Some("\"value1\"".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        let result = cache.get_raw("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "\"value1\"", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let deleted = cache.delete("key1").await.unwrap();
        assert!(deleted);

        let result = cache.get_raw("key1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let cache = InMemoryCache::new();

        let deleted = cache.delete("missing").await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "\"value1\"", Some(Duration::from_millis(50)))
            .await
            .unwrap();

        assert!(cache.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get_raw("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persistent_entry_has_no_ttl() {
        let cache = InMemoryCache::new();

        cache.set_raw("forever", "{}", None).await.unwrap();

        assert!(cache.exists("forever").await.unwrap());
        assert_eq!(cache.ttl("forever").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_with_persistent_clears_ttl() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        cache.set_raw("key", "2", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get_raw("key").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_ttl_remaining() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "\"value1\"", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let remaining = cache.ttl("key1").await.unwrap().unwrap();
        assert!(remaining.as_secs() > 50 && remaining.as_secs() <= 60);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let cache = InMemoryCache::new();

        let result = cache
            .set_nx_raw("key1", "\"value1\"", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(result);

        let result = cache
            .set_nx_raw("key1", "\"value2\"", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!result);

        let value = cache.get_raw("key1").await.unwrap();
        assert_eq!(value, Some("\"value1\"".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx_after_expiry() {
        let cache = InMemoryCache::new();

        assert!(
            cache
                .set_nx_raw("lock", "a", Duration::from_millis(30))
                .await
                .unwrap()
        );

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(
            cache
                .set_nx_raw("lock", "b", Duration::from_secs(5))
                .await
                .unwrap()
        );
        assert_eq!(cache.get_raw("lock").await.unwrap(), Some("b".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_of_expired_key_keep_fresh_lock() {
        let cache = Arc::new(InMemoryCache::new());

        cache
            .set_raw("lock", "stale", Some(Duration::from_millis(30)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let value = cache.get_raw("lock").await.unwrap();
                        assert_ne!(value, Some("stale".to_string()));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        assert!(
            cache
                .set_nx_raw("lock", "holder", Duration::from_secs(5))
                .await
                .unwrap()
        );

        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(
            cache.get_raw("lock").await.unwrap(),
            Some("holder".to_string())
        );
        assert!(
            !cache
                .set_nx_raw("lock", "intruder", Duration::from_secs(5))
                .await
                .unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_set_nx_is_exclusive_under_contention() {
        let cache = Arc::new(InMemoryCache::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .set_nx_raw("contended", &i.to_string(), Duration::from_secs(5))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_config() {
        let config = InMemoryCacheConfig::default().with_max_capacity(100);
        let cache = InMemoryCache::with_config(config);

        assert_eq!(cache.config().max_capacity, 100);
    }
}
