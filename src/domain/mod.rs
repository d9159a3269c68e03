//! Domain layer - Core types, traits and errors

pub mod cache;
pub mod error;
pub mod shop;

pub use cache::{
    Cache, CacheKey, CachedValue, FnLoader, Loader, LogicalEnvelope, ReadStrategy,
    loader_fn,
};
pub use error::DomainError;
pub use shop::{Shop, ShopId, ShopRepository};
