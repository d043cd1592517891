//! Application configuration

mod app_config;

pub use app_config::{AdapterSettings, AppConfig, CacheSettings, LogFormat, LoggingConfig};
