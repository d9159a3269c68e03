//! Shop service
//!
//! Reads shops through the cache-aside client and keeps the cache coherent
//! on writes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{DomainError, Loader, ReadStrategy, Shop, ShopId, ShopRepository};

use super::cache_aside_service::CacheAsideClient;

/// Key prefix of cached shops
pub const SHOP_CACHE_PREFIX: &str = "cache:shop:";

/// Configuration for the shop service
#[derive(Debug, Clone)]
pub struct ShopServiceConfig {
    /// Physical TTL of pass-through and mutex entries
    pub cache_ttl: Duration,
    /// Logical TTL of entries written by `warm` and background rebuilds
    pub logical_ttl: Duration,
}

impl Default for ShopServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            logical_ttl: Duration::from_secs(20),
        }
    }
}

/// Exposes the shop repository to the cache as a loader
#[derive(Debug)]
struct ShopLoader {
    repository: Arc<dyn ShopRepository>,
}

#[async_trait]
impl Loader<ShopId, Shop> for ShopLoader {
    async fn load(&self, id: &ShopId) -> Result<Option<Shop>, DomainError> {
        self.repository.get(id).await
    }
}

/// Cached access to shops
#[derive(Debug, Clone)]
pub struct ShopService {
    repository: Arc<dyn ShopRepository>,
    loader: Arc<ShopLoader>,
    client: CacheAsideClient,
    config: ShopServiceConfig,
}

impl ShopService {
    pub fn new(repository: Arc<dyn ShopRepository>, client: CacheAsideClient) -> Self {
        Self::with_config(repository, client, ShopServiceConfig::default())
    }

    pub fn with_config(
        repository: Arc<dyn ShopRepository>,
        client: CacheAsideClient,
        config: ShopServiceConfig,
    ) -> Self {
        Self {
            loader: Arc::new(ShopLoader {
                repository: repository.clone(),
            }),
            repository,
            client,
            config,
        }
    }

    pub fn config(&self) -> &ShopServiceConfig {
        &self.config
    }

    pub fn client(&self) -> &CacheAsideClient {
        &self.client
    }

    /// Looks up a shop with the given read strategy
    ///
    /// With `LogicalExpire` a shop that was never warmed is reported as absent.
    pub async fn query_by_id(
        &self,
        id: ShopId,
        strategy: ReadStrategy,
    ) -> Result<Option<Shop>, DomainError> {
        let ttl = match strategy {
            ReadStrategy::LogicalExpire => self.config.logical_ttl,
            ReadStrategy::PassThrough | ReadStrategy::Mutex => self.config.cache_ttl,
        };

        self.client
            .read(strategy, SHOP_CACHE_PREFIX, id, self.loader.clone(), ttl)
            .await
    }

    /// Writes the shop to the store, then drops its cache entry
    ///
    /// The store is written before the cache entry is deleted.
    pub async fn update(&self, shop: Shop) -> Result<Shop, DomainError> {
        if shop.name.trim().is_empty() {
            return Err(DomainError::validation("Shop name must not be empty"));
        }

        let updated = self.repository.update(shop).await?;
        self.client.invalidate(SHOP_CACHE_PREFIX, updated.id).await?;

        tracing::info!(shop_id = %updated.id, "Shop updated, cache entry invalidated");
        Ok(updated)
    }

    /// Loads a shop and stores it as a logical-expiry entry
    pub async fn warm(&self, id: ShopId, logical_ttl: Duration) -> Result<Shop, DomainError> {
        let shop = self
            .repository
            .get(&id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Shop with id '{}' not found", id)))?;

        self.client
            .write_logical(SHOP_CACHE_PREFIX, id, &shop, logical_ttl)
            .await?;

        tracing::info!(shop_id = %id, logical_ttl_secs = logical_ttl.as_secs(), "Shop warmed");
        Ok(shop)
    }
}
