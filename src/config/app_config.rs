use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, RebuildSchedulerConfig};
use crate::infrastructure::services::{CacheAsideConfig, ContendedPolicy, ShopServiceConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub cache_aside: CacheAsideSettings,
    pub shop: ShopSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tunables of the cache-aside client and its rebuild pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheAsideSettings {
    pub null_ttl_secs: u64,
    pub lock_ttl_secs: u64,
    pub retry_backoff_ms: u64,
    pub max_retries: u32,
    pub contended_policy: ContendedPolicy,
    pub rebuild_workers: usize,
    pub rebuild_queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    pub cache_ttl_secs: u64,
    pub logical_ttl_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheAsideSettings {
    fn default() -> Self {
        Self {
            null_ttl_secs: 120,
            lock_ttl_secs: 10,
            retry_backoff_ms: 50,
            max_retries: 100,
            contended_policy: ContendedPolicy::Error,
            rebuild_workers: 10,
            rebuild_queue_capacity: 1024,
        }
    }
}

impl CacheAsideSettings {
    pub fn client_config(&self) -> CacheAsideConfig {
        CacheAsideConfig::default()
            .with_null_ttl(Duration::from_secs(self.null_ttl_secs))
            .with_lock_ttl(Duration::from_secs(self.lock_ttl_secs))
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_max_retries(self.max_retries)
            .with_contended_policy(self.contended_policy)
    }

    pub fn scheduler_config(&self) -> RebuildSchedulerConfig {
        RebuildSchedulerConfig::default()
            .with_workers(self.rebuild_workers)
            .with_queue_capacity(self.rebuild_queue_capacity)
    }
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 60,
            logical_ttl_secs: 20,
        }
    }
}

impl ShopSettings {
    pub fn service_config(&self) -> ShopServiceConfig {
        ShopServiceConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            logical_ttl: Duration::from_secs(self.logical_ttl_secs),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Rejects values that would make locks or entries unusable
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.cache_aside.lock_ttl_secs == 0 {
            return Err(DomainError::configuration(
                "cache_aside.lock_ttl_secs must be greater than zero",
            ));
        }

        if self.cache_aside.null_ttl_secs == 0 {
            return Err(DomainError::configuration(
                "cache_aside.null_ttl_secs must be greater than zero",
            ));
        }

        if self.cache_aside.rebuild_workers == 0 {
            return Err(DomainError::configuration(
                "cache_aside.rebuild_workers must be greater than zero",
            ));
        }

        if self.shop.cache_ttl_secs == 0 || self.shop.logical_ttl_secs == 0 {
            return Err(DomainError::configuration("shop TTLs must be greater than zero"));
        }

        Ok(())
    }
}
