//! Sharded in-memory storage adapter using moka

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache as MokaCache;

use crate::domain::cache::{AdapterError, CacheEntry, StorageAdapter};

/// Configuration for the sharded in-memory adapter
#[derive(Debug, Clone, PartialEq)]
pub struct ShardedMemoryConfig {
    /// Number of shards, rounded up to a power of two
    pub shards: usize,
    /// Maximum number of entries across all shards
    pub max_capacity: u64,
    /// Backend-side lifetime; `None` leaves expiry to the cache layer
    pub life_window: Option<Duration>,
}

impl Default for ShardedMemoryConfig {
    fn default() -> Self {
        Self {
            shards: 4,
            max_capacity: 10_000,
            life_window: None,
        }
    }
}

impl ShardedMemoryConfig {
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
}

/// Thread-safe in-memory adapter
///
/// Keys are hashed onto independent moka caches so unrelated keys do not
/// contend. Entries are kept as serialized JSON bytes.
pub struct ShardedMemoryAdapter {
    shards: Vec<MokaCache<String, Bytes>>,
    config: ShardedMemoryConfig,
}

impl fmt::Debug for ShardedMemoryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedMemoryAdapter")
            .field("shards", &self.shards.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ShardedMemoryAdapter {
    pub fn new() -> Self {
        Self::with_config(ShardedMemoryConfig::default())
    }

    pub fn with_config(config: ShardedMemoryConfig) -> Self {
        let shard_count = config.shards.max(1).next_power_of_two();
        let per_shard_capacity = (config.max_capacity / shard_count as u64).max(1);

        let shards = (0..shard_count)
            .map(|_| {
                let mut builder = MokaCache::builder().max_capacity(per_shard_capacity);
                if let Some(life_window) = config.life_window {
                    builder = builder.time_to_live(life_window);
                }
                builder.build()
            })
            .collect();

        Self { shards, config }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize & (self.shards.len() - 1)
    }

    fn shard(&self, key: &str) -> &MokaCache<String, Bytes> {
        &self.shards[self.shard_index(key)]
    }

    /// Approximate number of entries across all shards
    pub async fn entry_count(&self) -> u64 {
        let mut total = 0;
        for shard in &self.shards {
            shard.run_pending_tasks().await;
            total += shard.entry_count();
        }
        total
    }

    pub async fn clear(&self) {
        for shard in &self.shards {
            shard.invalidate_all();
            shard.run_pending_tasks().await;
        }
    }

    fn serialize(entry: &CacheEntry) -> Result<Bytes, AdapterError> {
        serde_json::to_vec(entry)
            .map(Bytes::from)
            .map_err(|e| AdapterError::serialization(format!("Failed to serialize entry: {}", e)))
    }

    fn deserialize(data: &[u8]) -> Result<CacheEntry, AdapterError> {
        serde_json::from_slice(data).map_err(|e| {
            AdapterError::serialization(format!("Failed to deserialize entry: {}", e))
        })
    }
}

impl Default for ShardedMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for ShardedMemoryAdapter {
    async fn get(&self, key: &str) -> Result<CacheEntry, AdapterError> {
        match self.shard(key).get(key).await {
            Some(data) => Self::deserialize(&data),
            None => Err(AdapterError::NotFound),
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), AdapterError> {
        let data = Self::serialize(&entry)?;
        self.shard(key).insert(key.to_string(), data).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AdapterError> {
        match self.shard(key).remove(key).await {
            Some(_) => Ok(()),
            None => Err(AdapterError::NotFound),
        }
    }
}
