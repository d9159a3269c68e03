//! Shop domain module
//!
//! Shops are the entity served through the cache-aside layer. The cache only
//! ever sees them through a `Loader`, so nothing here knows about caching.

mod entity;
mod repository;

pub use entity::{Shop, ShopId};
pub use repository::ShopRepository;
