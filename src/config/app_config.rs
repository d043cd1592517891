use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::cache::{AdapterConfig, AdapterType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for the shared cache instance
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL applied to every write
    pub default_ttl_secs: u64,
    /// Interval between stats log lines, `0` disables the reporter
    pub stats_interval_secs: u64,
    pub adapter: AdapterSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterSettings {
    pub adapter_type: AdapterType,
    pub shards: usize,
    pub max_capacity: u64,
    /// Backend-side lifetime in seconds, unset to leave expiry to the cache
    pub life_window_secs: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            stats_interval_secs: 5,
            adapter: AdapterSettings::default(),
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        let defaults = AdapterConfig::default();
        Self {
            adapter_type: defaults.adapter_type,
            shards: defaults.shards,
            max_capacity: defaults.max_capacity,
            life_window_secs: None,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        let mut config = AdapterConfig {
            adapter_type: self.adapter.adapter_type,
            shards: self.adapter.shards,
            max_capacity: self.adapter.max_capacity,
            life_window: None,
        };

        if let Some(secs) = self.adapter.life_window_secs {
            config = config.with_life_window(Duration::from_secs(secs));
        }

        config
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.default_ttl_secs == 0 {
            return Err(DomainError::validation(
                "default_ttl_secs must be greater than zero",
            ));
        }

        self.adapter_config().validate()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.stats_interval(), Some(Duration::from_secs(5)));
        assert_eq!(config.cache.adapter.shards, 4);
        assert!(config.cache.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_disables_reporter() {
        let settings = CacheSettings {
            stats_interval_secs: 0,
            ..Default::default()
        };

        assert_eq!(settings.stats_interval(), None);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let settings = CacheSettings {
            default_ttl_secs: 0,
            ..Default::default()
        };

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_adapter_config_carries_life_window() {
        let mut settings = CacheSettings::default();
        settings.adapter.shards = 8;
        settings.adapter.life_window_secs = Some(120);

        let adapter = settings.adapter_config();
        assert_eq!(adapter.shards, 8);
        assert_eq!(adapter.life_window, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "logging": { "format": "json" },
            "cache": { "default_ttl_secs": 40, "adapter": { "shards": 16 } }
        }))
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cache.default_ttl_secs, 40);
        assert_eq!(config.cache.adapter.shards, 16);
        assert_eq!(config.cache.adapter.max_capacity, 10_000);
    }
}
