//! Cache-aside read path
//!
//! Serves reads of slow-changing records from a shared cache and shields the
//! backing store with three read strategies:
//! - pass-through with negative caching of absent keys
//! - mutex-guarded reload with a self-expiring distributed lock
//! - logical expiration with background rebuilds on a bounded worker pool
//!
//! The cache backend (moka in-memory or Redis) is chosen through configuration.

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
