//! Cache key construction

use std::fmt;

/// Prefix prepended to a cache key to form the key of its rebuild lock
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// Namespaced cache key: `prefix + identifier`
///
/// Distinct entity kinds share one cache and are kept apart by their prefix,
/// so prefixes must be disjoint (e.g. `cache:shop:` and `cache:user:`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    id: String,
    full: String,
}

impl CacheKey {
    /// Creates a key from a prefix and any displayable identifier
    pub fn new(prefix: impl Into<String>, id: impl fmt::Display) -> Self {
        let prefix = prefix.into();
        let id = id.to_string();
        let full = format!("{}{}", prefix, id);

        Self { prefix, id, full }
    }

    /// Returns the full key as stored in the cache
    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the key guarding rebuilds of this entry: `lock:<prefix><id>`
    pub fn lock_key(&self) -> String {
        format!("{}{}", LOCK_KEY_PREFIX, self.full)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_concatenates_prefix_and_id() {
        let key = CacheKey::new("cache:shop:", 1);
        assert_eq!(key.as_str(), "cache:shop:1");
        assert_eq!(key.prefix(), "cache:shop:");
        assert_eq!(key.id(), "1");
    }

    #[test]
    fn test_lock_key() {
        let key = CacheKey::new("cache:shop:", 42);
        assert_eq!(key.lock_key(), "lock:cache:shop:42");
    }

    #[test]
    fn test_disjoint_prefixes_do_not_collide() {
        let shop = CacheKey::new("cache:shop:", 1);
        let user = CacheKey::new("cache:user:", 1);

        assert_ne!(shop, user);
        assert_ne!(shop.lock_key(), user.lock_key());
    }

    #[test]
    fn test_display_matches_as_str() {
        let key = CacheKey::new("cache:shop:", "abc");
        assert_eq!(key.to_string(), key.as_str());
    }
}
