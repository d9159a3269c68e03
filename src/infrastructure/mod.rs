//! Infrastructure layer - cache backends, services and runtime wiring

pub mod cache;
pub mod logging;
pub mod observability;
pub mod services;
pub mod shop;
