//! Cache factory for runtime selection

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::domain::cache::Cache;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache types
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis cache
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Type of cache to create
    pub cache_type: CacheType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing (Redis only)
    pub key_prefix: Option<String>,
    /// Maximum capacity (in-memory only)
    pub max_capacity: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            max_capacity: Some(10_000),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration for in-memory cache
    pub fn in_memory() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            ..Default::default()
        }
    }

    /// Creates a new configuration for Redis cache
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the maximum capacity (in-memory only)
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache instance based on configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        match config.cache_type {
            CacheType::InMemory => {
                let mut in_memory_config = InMemoryCacheConfig::default();

                if let Some(capacity) = config.max_capacity {
                    in_memory_config = in_memory_config.with_max_capacity(capacity);
                }

                tracing::info!(
                    max_capacity = in_memory_config.max_capacity,
                    "Using in-memory cache"
                );
                Ok(Arc::new(InMemoryCache::with_config(in_memory_config)))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let mut redis_config = RedisCacheConfig::new(url);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                tracing::info!(url = %redis_config.url, "Connecting to Redis cache");
                let cache = RedisCache::new(redis_config).await?;
                Ok(Arc::new(cache))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cache_type_from_str() {
        assert_eq!("in_memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("REDIS".parse::<CacheType>().unwrap(), CacheType::Redis);
    }

    #[test]
    fn test_cache_type_from_str_invalid() {
        let result = "memcached".parse::<CacheType>();
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_cache_config_builders() {
        let config = CacheConfig::redis("redis://localhost:6379").with_key_prefix("shops");

        assert_eq!(config.cache_type, CacheType::Redis);
        assert_eq!(config.redis_url, Some("redis://localhost:6379".to_string()));
        assert_eq!(config.key_prefix, Some("shops".to_string()));

        let config = CacheConfig::in_memory().with_max_capacity(50);
        assert_eq!(config.max_capacity, Some(50));
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::in_memory())
            .await
            .unwrap();

        cache
            .set_raw("test", "\"value\"", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let result = cache.get_raw("test").await.unwrap();
        assert_eq!(result, Some("\"value\"".to_string()));
    }

    #[tokio::test]
    async fn test_factory_create_redis_missing_url() {
        let config = CacheConfig {
            cache_type: CacheType::Redis,
            redis_url: None,
            ..Default::default()
        };

        let result = CacheFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_cache_type_display() {
        assert_eq!(CacheType::InMemory.to_string(), "in_memory");
        assert_eq!(CacheType::Redis.to_string(), "redis");
    }
}
