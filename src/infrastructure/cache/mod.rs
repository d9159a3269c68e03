//! Cache infrastructure - store implementations, lock and rebuild pool

mod factory;
mod in_memory;
mod lock;
mod rebuild;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use lock::{DistributedLock, LockGuard};
pub use rebuild::{RebuildScheduler, RebuildSchedulerConfig};
pub use redis::{RedisCache, RedisCacheConfig};
