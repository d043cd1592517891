//! Cache orchestration service
//!
//! Wraps a [`StorageAdapter`] with TTL evaluation, stale-while-revalidate
//! reads, single-flight population and tag-based invalidation.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::cache::{
    AdapterError, CacheEntry, CacheError, CacheOperation, DeleteOptions, DeleteScope, EntryState,
    GetOptions, Loader, StorageAdapter,
};
use crate::infrastructure::cache::{CacheStats, CleanupReport, SingleFlight, TagIndex};

/// Key-based delete calls tolerated before the tag index is reconciled
pub const DELETE_THRESHOLD: u32 = 20;

const CLEANUP_FLIGHT_KEY: &str = "cleanup";

/// Per-key outcome of a `delete` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<CacheError>,
}

impl DeletionResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Failed `delete` call, carrying the per-key detail next to the joined error
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct DeletionError {
    pub result: DeletionResult,
    pub error: CacheError,
}

impl DeletionError {
    fn invalid(error: CacheError) -> Self {
        Self {
            result: DeletionResult::default(),
            error,
        }
    }
}

impl From<DeletionError> for CacheError {
    fn from(e: DeletionError) -> Self {
        e.error
    }
}

struct CacheInner {
    adapter: Arc<dyn StorageAdapter>,
    ttl: Duration,
    loads: SingleFlight<Result<Value, CacheError>>,
    cleanups: SingleFlight<Option<CleanupReport>>,
    tags: TagIndex,
    delete_threshold: AtomicU32,
    stats: Arc<CacheStats>,
}

/// Shared cache handle
///
/// Cloning is cheap and every clone operates on the same state, so one
/// instance can be built at startup and handed to all request handlers.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("ttl", &self.inner.ttl)
            .field("delete_threshold", &self.delete_threshold())
            .field("loads_in_flight", &self.inner.loads.in_flight())
            .finish()
    }
}

impl CacheService {
    /// Creates a cache writing entries with the given default TTL
    pub fn new(adapter: Arc<dyn StorageAdapter>, ttl: Duration) -> Self {
        Self::with_stats(adapter, ttl, Arc::new(CacheStats::new()))
    }

    pub fn with_stats(adapter: Arc<dyn StorageAdapter>, ttl: Duration, stats: Arc<CacheStats>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                adapter,
                ttl,
                loads: SingleFlight::new(),
                cleanups: SingleFlight::new(),
                tags: TagIndex::new(),
                delete_threshold: AtomicU32::new(0),
                stats,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Key-based delete calls since the last cleanup pass
    pub fn delete_threshold(&self) -> u32 {
        self.inner.delete_threshold.load(Ordering::SeqCst)
    }

    /// Keys currently registered under `tag`
    pub async fn tag_keys(&self, tag: &str) -> Option<Vec<String>> {
        self.inner.tags.keys(tag).await
    }

    /// All tags currently tracked
    pub async fn tags(&self) -> Vec<String> {
        self.inner.tags.tags().await
    }

    /// Reads `key`, consulting the loader on a miss, a stale hit or a bypass
    pub async fn get(&self, key: &str, options: &GetOptions) -> Result<Value, CacheError> {
        self.get_value(key, options)
            .await
            .map_err(|e| e.in_operation(CacheOperation::Get, key))
    }

    /// Reads `key` and deserializes the value into `T`
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &GetOptions,
    ) -> Result<T, CacheError> {
        let value = self.get(key, options).await?;
        serde_json::from_value(value).map_err(|e| {
            CacheError::invalid_entry(format!("Failed to deserialize cache value: {}", e))
                .in_operation(CacheOperation::Get, key)
        })
    }

    async fn get_value(&self, key: &str, options: &GetOptions) -> Result<Value, CacheError> {
        options.validate()?;

        if options.bypass {
            let loader = options.loader.clone().ok_or(CacheError::LoaderNil)?;
            tracing::debug!(key = %key, "Bypassing adapter");
            return self.load(key, loader).await;
        }

        let entry = match self.inner.adapter.get(key).await {
            Ok(entry) => entry,
            Err(AdapterError::NotFound) => {
                self.inner.stats.record_miss();
                let Some(loader) = options.loader.clone() else {
                    return Err(CacheError::EntryNotFound);
                };
                tracing::debug!(key = %key, "Cache miss, loading entry");
                return self.load_and_set(key, loader).await;
            }
            Err(e) => return Err(e.into()),
        };

        match (entry.state(options.stale_response_ttl), options.loader.clone()) {
            (EntryState::Valid, _) => {
                self.inner.stats.record_hit();
                Ok(entry.value)
            }
            (EntryState::Stale, Some(loader)) => {
                self.inner.stats.record_stale_serve();
                tracing::debug!(key = %key, "Entry is stale, refreshing");
                self.load_and_set(key, loader).await
            }
            (_, None) => {
                self.inner.stats.record_miss();
                self.evict(key).await?;
                Err(CacheError::EntryNotFound)
            }
            (EntryState::Expired, Some(_)) => {
                self.inner.stats.record_miss();
                self.evict(key).await?;
                Err(CacheError::StaleResponse)
            }
        }
    }

    /// Removes an expired entry; a concurrent removal is not an error
    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        match self.inner.adapter.delete(key).await {
            Ok(()) | Err(AdapterError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Runs the loader once per key across concurrent callers
    async fn load(&self, key: &str, loader: Arc<dyn Loader>) -> Result<Value, CacheError> {
        let this = self.clone();
        let owned_key = key.to_string();

        self.inner
            .loads
            .run(key, move || async move { this.invoke_loader(&owned_key, loader).await })
            .await
            .unwrap_or_else(|e| Err(CacheError::LoaderFailed { message: e.to_string() }))
    }

    /// Shares the load with concurrent callers, then writes the value back with
    /// the default TTL
    ///
    /// Each populating caller writes the shared value itself; bypass callers
    /// never write.
    async fn load_and_set(&self, key: &str, loader: Arc<dyn Loader>) -> Result<Value, CacheError> {
        let value = self.load(key, loader).await?;
        self.write(key, value.clone(), self.inner.ttl)
            .await
            .map_err(|e| CacheError::from(e).in_operation(CacheOperation::Set, key))?;
        Ok(value)
    }

    async fn invoke_loader(&self, key: &str, loader: Arc<dyn Loader>) -> Result<Value, CacheError> {
        let started = Instant::now();
        let result = loader.load(key).await;
        self.inner.stats.record_load(started.elapsed());

        result.map_err(|e| {
            tracing::debug!(key = %key, error = %e, "Loader failed");
            CacheError::loader_failed(e)
        })
    }

    async fn write(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AdapterError> {
        self.inner.adapter.set(key, CacheEntry::new(value, ttl)).await?;
        self.inner.stats.record_set();
        Ok(())
    }

    /// Stores `value` under `key` with the default TTL and registers it under
    /// `tags` once the write succeeded
    pub async fn set<V, S>(&self, key: &str, value: V, tags: &[S]) -> Result<(), CacheError>
    where
        V: Serialize,
        S: AsRef<str>,
    {
        self.set_value(key, value, tags)
            .await
            .map_err(|e| e.in_operation(CacheOperation::Set, key))
    }

    async fn set_value<V, S>(&self, key: &str, value: V, tags: &[S]) -> Result<(), CacheError>
    where
        V: Serialize,
        S: AsRef<str>,
    {
        let value = serde_json::to_value(value).map_err(|e| {
            CacheError::invalid_entry(format!("Failed to serialize cache value: {}", e))
        })?;
        self.write(key, value, self.inner.ttl).await?;
        self.inner.tags.register(key, tags).await;
        Ok(())
    }

    /// Deletes explicit keys, or every key registered under the given tags
    ///
    /// Each key is attempted. When any key fails the call returns a
    /// [`DeletionError`] holding both the joined error and the per-key result.
    pub async fn delete(&self, options: &DeleteOptions) -> Result<DeletionResult, DeletionError> {
        let keys = match options.scope().map_err(DeletionError::invalid)? {
            DeleteScope::Keys(keys) => {
                self.inner.delete_threshold.fetch_add(1, Ordering::SeqCst);
                keys.to_vec()
            }
            DeleteScope::Tags(tags) => {
                let keys = self.inner.tags.keys_for(tags).await;
                self.inner.stats.record_tag_invalidation();
                tracing::debug!(tags = ?tags, keys = ?keys, "Deleting keys by tag");
                keys
            }
        };

        let mut result = DeletionResult::default();
        for key in keys {
            match self.inner.adapter.delete(&key).await {
                Ok(()) => {
                    self.inner.stats.record_delete_hit();
                    result.succeeded.push(key);
                }
                Err(e) => {
                    self.inner.stats.record_delete_miss();
                    result
                        .failed
                        .push(CacheError::from(e).in_operation(CacheOperation::Delete, &key));
                }
            }
        }

        if self.delete_threshold() > DELETE_THRESHOLD {
            self.run_cleanup().await;
        }

        match CacheError::join(result.failed.clone()) {
            Some(error) => Err(DeletionError { result, error }),
            None => Ok(result),
        }
    }

    /// Rewrites the entry with a zero TTL, keeping its last value
    pub async fn soft_delete(&self, key: &str) -> Result<(), CacheError> {
        self.soft_delete_value(key)
            .await
            .map_err(|e| e.in_operation(CacheOperation::SoftDelete, key))
    }

    async fn soft_delete_value(&self, key: &str) -> Result<(), CacheError> {
        let value = self.get_value(key, &GetOptions::default()).await?;
        tracing::debug!(key = %key, "Soft deleting entry");
        self.write(key, value, Duration::ZERO).await?;
        Ok(())
    }

    /// Reconciles the tag index, at most one pass at a time
    async fn run_cleanup(&self) {
        let this = self.clone();

        let outcome = self
            .inner
            .cleanups
            .run(CLEANUP_FLIGHT_KEY, move || async move {
                // A pass that finished while this caller was queued already
                // reset the counter
                if this.delete_threshold() <= DELETE_THRESHOLD {
                    return None;
                }

                let report = this.cleanup_tags().await;
                this.inner.delete_threshold.store(0, Ordering::SeqCst);
                this.inner.stats.record_cleanup();
                Some(report)
            })
            .await;

        match outcome {
            Ok(Some(report)) => tracing::debug!(
                tags_scanned = report.tags_scanned,
                keys_dropped = report.keys_dropped,
                tags_removed = report.tags_removed,
                "Tag index cleanup finished"
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Tag index cleanup did not complete"),
        }
    }

    async fn cleanup_tags(&self) -> CleanupReport {
        self.inner
            .tags
            .retain(|key| async move {
                match self.get(&key, &GetOptions::default()).await {
                    Ok(_) => true,
                    Err(e) if e.is_not_found() => false,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Keeping tagged key after failed check");
                        true
                    }
                }
            })
            .await
    }
}
