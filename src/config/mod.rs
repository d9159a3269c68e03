//! Application configuration

mod app_config;

pub use app_config::{AppConfig, CacheAsideSettings, LogFormat, LoggingConfig, ShopSettings};
