//! Encoding of cached values
//!
//! Two shapes are stored:
//! - plain: the JSON of the value itself, or the empty string as a negative
//!   cache marker meaning "confirmed absent from the backing store";
//! - logical: `{"data": .., "logicalExpireAt": ..}` stored without a physical
//!   TTL, judged stale by comparing the timestamp to wall-clock time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::DomainError;

/// Payload written for keys confirmed absent from the backing store
pub const NEGATIVE_MARKER: &str = "";

/// A decoded plain cache entry
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue<V> {
    /// A real value
    Hit(V),
    /// Negative cache entry: the backing store has no such record
    Negative,
}

impl<V> CachedValue<V> {
    pub fn into_option(self) -> Option<V> {
        match self {
            CachedValue::Hit(value) => Some(value),
            CachedValue::Negative => None,
        }
    }
}

/// Value wrapped with an application-level expiry timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalEnvelope<V> {
    pub data: V,
    pub logical_expire_at: DateTime<Utc>,
}

impl<V> LogicalEnvelope<V> {
    /// Wraps `data` so that it is considered fresh for `ttl` from now
    pub fn new(data: V, ttl: Duration) -> Self {
        Self::expiring_at(data, expiry_after(Utc::now(), ttl))
    }

    pub fn expiring_at(data: V, logical_expire_at: DateTime<Utc>) -> Self {
        Self {
            data,
            logical_expire_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.logical_expire_at <= now
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Encodes a value in the plain shape
pub fn encode_plain<V: Serialize + ?Sized>(value: &V) -> Result<String, DomainError> {
    serde_json::to_string(value)
        .map_err(|e| DomainError::serialization(format!("Failed to encode value: {}", e)))
}

/// Decodes a plain entry, recognising the negative marker
pub fn decode_plain<V: DeserializeOwned>(raw: &str) -> Result<CachedValue<V>, DomainError> {
    if raw.trim().is_empty() {
        return Ok(CachedValue::Negative);
    }

    serde_json::from_str(raw)
        .map(CachedValue::Hit)
        .map_err(|e| DomainError::decode(format!("Failed to decode cached value: {}", e)))
}

pub fn encode_logical<V: Serialize>(envelope: &LogicalEnvelope<V>) -> Result<String, DomainError> {
    serde_json::to_string(envelope)
        .map_err(|e| DomainError::serialization(format!("Failed to encode envelope: {}", e)))
}

pub fn decode_logical<V: DeserializeOwned>(raw: &str) -> Result<LogicalEnvelope<V>, DomainError> {
    serde_json::from_str(raw)
        .map_err(|e| DomainError::decode(format!("Failed to decode envelope: {}", e)))
}
