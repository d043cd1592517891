//! In-process caching middleware
//!
//! Wraps any [`StorageAdapter`] with:
//! - TTL-based expiry evaluated at read time
//! - Stale-while-revalidate reads with a per-call stale window
//! - Single-flight loading, so concurrent misses run the loader once
//! - Tag-based bulk invalidation with lazy, threshold-triggered cleanup
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use inmem_cache::{loader_fn, CacheService, GetOptions, ShardedMemoryAdapter};
//!
//! let cache = CacheService::new(Arc::new(ShardedMemoryAdapter::new()), Duration::from_secs(40));
//! let options = GetOptions::default()
//!     .with_loader(loader_fn(|key| async move { fetch_product(&key).await }))
//!     .with_stale_response(Duration::from_secs(10));
//!
//! let product = cache.get("product:42", &options).await?;
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::cache::{
    loader_fn, AdapterError, CacheEntry, CacheError, CacheOperation, DeleteOptions, EntryState,
    GetOptions, Loader, StorageAdapter,
};
pub use infrastructure::cache::{
    AdapterConfig, AdapterFactory, CacheStats, CacheStatsSnapshot, ShardedMemoryAdapter,
    ShardedMemoryConfig,
};
pub use infrastructure::services::{CacheService, DeletionError, DeletionResult, DELETE_THRESHOLD};
