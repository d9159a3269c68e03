//! Shop entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Shop identifier - positive integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ShopId(u64);

impl ShopId {
    /// Create a new ShopId, rejecting zero
    pub fn new(id: u64) -> Result<Self, DomainError> {
        if id == 0 {
            return Err(DomainError::validation("Shop id must be a positive integer"));
        }
        Ok(Self(id))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for ShopId {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShopId> for u64 {
    fn from(id: ShopId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ShopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u64 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("Invalid shop id: {}", s)))?;
        Self::new(id)
    }
}

/// A shop listing, the entity served through the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub type_id: u64,
    #[serde(default)]
    pub area: Option<String>,
    pub address: String,
    /// Average price in cents
    pub avg_price: u64,
    /// Rating scaled by 10 (e.g. 47 = 4.7)
    pub score: u32,
    #[serde(default)]
    pub open_hours: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    pub fn new(id: ShopId, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            type_id: 1,
            area: None,
            address: address.into(),
            avg_price: 0,
            score: 0,
            open_hours: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_avg_price(mut self, avg_price: u64) -> Self {
        self.avg_price = avg_price;
        self
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    pub fn with_open_hours(mut self, hours: impl Into<String>) -> Self {
        self.open_hours = Some(hours.into());
        self
    }

    /// Marks the record as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
