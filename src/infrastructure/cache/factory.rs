//! Storage adapter factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::cache::StorageAdapter;
use crate::domain::DomainError;

use super::sharded_memory::{ShardedMemoryAdapter, ShardedMemoryConfig};

/// Supported storage adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Sharded in-memory adapter using moka
    #[default]
    ShardedMemory,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterType::ShardedMemory => write!(f, "sharded_memory"),
        }
    }
}

impl std::str::FromStr for AdapterType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sharded_memory" | "in_memory" | "memory" => Ok(AdapterType::ShardedMemory),
            _ => Err(DomainError::configuration(format!(
                "Unknown adapter type: {}. Valid types: sharded_memory",
                s
            ))),
        }
    }
}

/// Configuration for the adapter factory
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub adapter_type: AdapterType,
    pub shards: usize,
    pub max_capacity: u64,
    pub life_window: Option<Duration>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let memory = ShardedMemoryConfig::default();
        Self {
            adapter_type: AdapterType::default(),
            shards: memory.shards,
            max_capacity: memory.max_capacity,
            life_window: memory.life_window,
        }
    }
}

impl AdapterConfig {
    pub fn sharded_memory() -> Self {
        Self {
            adapter_type: AdapterType::ShardedMemory,
            ..Default::default()
        }
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_life_window(mut self, life_window: Duration) -> Self {
        self.life_window = Some(life_window);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.shards == 0 || !self.shards.is_power_of_two() {
            return Err(DomainError::validation(format!(
                "shards must be a power of two, got {}",
                self.shards
            )));
        }

        if self.max_capacity == 0 {
            return Err(DomainError::validation("max_capacity must be greater than zero"));
        }

        Ok(())
    }
}

/// Factory for creating storage adapters
#[derive(Debug, Default)]
pub struct AdapterFactory;

impl AdapterFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn create(&self, config: &AdapterConfig) -> Result<Arc<dyn StorageAdapter>, DomainError> {
        config.validate()?;

        match config.adapter_type {
            AdapterType::ShardedMemory => {
                let mut memory_config = ShardedMemoryConfig::default()
                    .with_shards(config.shards)
                    .with_max_capacity(config.max_capacity);

                if let Some(life_window) = config.life_window {
                    memory_config = memory_config.with_life_window(life_window);
                }

                tracing::debug!(
                    shards = config.shards,
                    max_capacity = config.max_capacity,
                    "Creating sharded in-memory adapter"
                );

                Ok(Arc::new(ShardedMemoryAdapter::with_config(memory_config)))
            }
        }
    }
}
