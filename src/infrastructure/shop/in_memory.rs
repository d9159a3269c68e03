//! In-memory shop repository

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{DomainError, Shop, ShopId, ShopRepository};

/// In-memory implementation of ShopRepository
///
/// An optional latency is applied to every read to stand in for a slow database.
#[derive(Debug, Default)]
pub struct InMemoryShopRepository {
    shops: RwLock<HashMap<ShopId, Shop>>,
    latency: Duration,
    reads: AtomicUsize,
}

impl InMemoryShopRepository {
    /// Creates a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with the given shops
    pub fn with_shops(shops: impl IntoIterator<Item = Shop>) -> Self {
        Self {
            shops: RwLock::new(shops.into_iter().map(|shop| (shop.id, shop)).collect()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `get` calls served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.shops.read().map(|shops| shops.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A handful of shops used by the command line and demos
pub fn sample_shops() -> Vec<Shop> {
    let rows: [(u64, &str, &str, &str, u64, u32, &str); 4] = [
        (1, "103 Tea House", "Jinghua Road 42", "Daning", 8_000, 37, "10:00-22:00"),
        (2, "Harbor Noodle Bar", "Wharf Street 8", "Riverside", 4_500, 42, "11:00-21:30"),
        (3, "Old Town Bakery", "Market Square 3", "Old Town", 2_200, 46, "07:00-18:00"),
        (4, "Night Owl Grill", "Station Lane 19", "Daning", 12_000, 40, "17:00-02:00"),
    ];

    rows.into_iter()
        .filter_map(|(id, name, address, area, price, score, hours)| {
            let id = ShopId::new(id).ok()?;
            Some(
                Shop::new(id, name, address)
                    .with_area(area)
                    .with_avg_price(price)
                    .with_score(score)
                    .with_open_hours(hours),
            )
        })
        .collect()
}

#[async_trait]
impl ShopRepository for InMemoryShopRepository {
    async fn get(&self, id: &ShopId) -> Result<Option<Shop>, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let shops = self
            .shops
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(shops.get(id).cloned())
    }

    async fn save(&self, shop: Shop) -> Result<Shop, DomainError> {
        let mut shops = self
            .shops
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        shops.insert(shop.id, shop.clone());
        Ok(shop)
    }

    async fn update(&self, mut shop: Shop) -> Result<Shop, DomainError> {
        let mut shops = self
            .shops
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        if !shops.contains_key(&shop.id) {
            return Err(DomainError::not_found(format!(
                "Shop with id '{}' not found",
                shop.id
            )));
        }

        shop.touch();
        shops.insert(shop.id, shop.clone());
        Ok(shop)
    }

    async fn delete(&self, id: &ShopId) -> Result<bool, DomainError> {
        let mut shops = self
            .shops
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(shops.remove(id).is_some())
    }
}
