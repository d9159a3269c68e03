//! Read strategy selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// How a cache-aside read protects the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Negative caching only; concurrent misses may all hit the store
    #[default]
    PassThrough,
    /// Only the holder of the rebuild lock loads; others wait and re-read
    Mutex,
    /// Serve stale data while a background task refreshes the entry
    LogicalExpire,
}

impl ReadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStrategy::PassThrough => "pass_through",
            ReadStrategy::Mutex => "mutex",
            ReadStrategy::LogicalExpire => "logical_expire",
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pass_through" | "passthrough" => Ok(ReadStrategy::PassThrough),
            "mutex" => Ok(ReadStrategy::Mutex),
            "logical_expire" | "logical" => Ok(ReadStrategy::LogicalExpire),
            _ => Err(DomainError::validation(format!(
                "Unknown read strategy: {}. Valid strategies: pass_through, mutex, logical_expire",
                s
            ))),
        }
    }
}
