//! Shop infrastructure implementations

mod in_memory;

pub use in_memory::{InMemoryShopRepository, sample_shops};
