//! Shop repository trait

use async_trait::async_trait;

use super::entity::{Shop, ShopId};
use crate::domain::DomainError;

/// Backing store for shops
#[async_trait]
pub trait ShopRepository: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: &ShopId) -> Result<Option<Shop>, DomainError>;

    /// Creates or replaces a shop
    async fn save(&self, shop: Shop) -> Result<Shop, DomainError>;

    /// Updates an existing shop, `NotFound` if it does not exist
    async fn update(&self, shop: Shop) -> Result<Shop, DomainError>;

    async fn delete(&self, id: &ShopId) -> Result<bool, DomainError>;
}
