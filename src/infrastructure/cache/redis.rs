//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::DomainError;
use crate::domain::cache::Cache;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis cache implementation
///
/// TTLs are sent in milliseconds (`PX`) so sub-second lock and negative-cache
/// lifetimes are honoured. Set-if-absent is a single `SET NX PX` command.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

impl RedisCache {
    /// Creates a new Redis cache connection
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::store_unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            DomainError::store_unavailable(format!(
                "Timed out connecting to Redis after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| DomainError::store_unavailable(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis cache with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisCacheConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn.get(&prefixed_key).await.map_err(|e| {
            DomainError::store_unavailable(format!("Failed to get key '{}': {}", key, e))
        })?;

        Ok(result)
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: redis::RedisResult<()> = match ttl {
            Some(ttl) => conn.pset_ex(&prefixed_key, value, ttl_millis(ttl)).await,
            None => conn.set(&prefixed_key, value).await,
        };

        result.map_err(|e| {
            DomainError::store_unavailable(format!("Failed to set key '{}': {}", key, e))
        })
    }

    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::store_unavailable(format!("Failed to set_nx key '{}': {}", key, e))
            })?;

        // Redis returns "OK" if set, nil if the key existed
        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::store_unavailable(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let exists: bool = conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::store_unavailable(format!(
                "Failed to check existence of key '{}': {}",
                key, e
            ))
        })?;

        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_ms: i64 = conn.pttl(&prefixed_key).await.map_err(|e| {
            DomainError::store_unavailable(format!("Failed to get TTL for key '{}': {}", key, e))
        })?;

        // Redis returns -2 if key doesn't exist, -1 if no TTL
        if ttl_ms < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(ttl_ms as u64)))
        }
    }
}
