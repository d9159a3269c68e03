//! Cache domain - cache-aside building blocks

mod envelope;
mod key;
mod loader;
mod repository;
mod strategy;

pub use envelope::{
    CachedValue, LogicalEnvelope, NEGATIVE_MARKER, decode_logical, decode_plain, encode_logical,
    encode_plain,
};
pub use key::{CacheKey, LOCK_KEY_PREFIX};
pub use loader::{FnLoader, Loader, loader_fn};
pub use repository::Cache;
pub use strategy::ReadStrategy;

#[cfg(test)]
pub use repository::mock::MockCache;
