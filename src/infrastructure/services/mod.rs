//! Infrastructure services

mod cache_aside_service;
mod shop_service;

pub use cache_aside_service::{CacheAsideClient, CacheAsideConfig, ContendedPolicy};
pub use shop_service::{SHOP_CACHE_PREFIX, ShopService, ShopServiceConfig};
