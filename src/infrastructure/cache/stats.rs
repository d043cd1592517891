//! Cache statistics counters and periodic reporter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

/// Lock-free counters updated by the cache on every operation
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_serves: AtomicU64,
    loads: AtomicU64,
    load_time_ms: AtomicU64,
    sets: AtomicU64,
    tag_invalidations: AtomicU64,
    delete_hits: AtomicU64,
    delete_misses: AtomicU64,
    cleanup_runs: AtomicU64,
}

/// Point-in-time view of [`CacheStats`] with derived ratios
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub stale_serves: u64,
    pub loads: u64,
    pub total_load_time_ms: u64,
    pub avg_load_time_ms: f64,
    pub sets: u64,
    /// Writes minus successful deletes. Overwrites and evictions are not
    /// subtracted, so this is an upper bound on live entries
    pub net_writes: u64,
    pub tag_invalidations: u64,
    pub delete_hits: u64,
    pub delete_misses: u64,
    pub delete_hit_ratio: f64,
    pub cleanup_runs: u64,
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_serve(&self) {
        self.stale_serves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, elapsed: Duration) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.load_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tag_invalidation(&self) {
        self.tag_invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete_hit(&self) {
        self.delete_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete_miss(&self) {
        self.delete_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self) {
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let loads = self.loads.load(Ordering::Relaxed);
        let total_load_time_ms = self.load_time_ms.load(Ordering::Relaxed);
        let sets = self.sets.load(Ordering::Relaxed);
        let delete_hits = self.delete_hits.load(Ordering::Relaxed);
        let delete_misses = self.delete_misses.load(Ordering::Relaxed);

        let avg_load_time_ms = if loads == 0 {
            0.0
        } else {
            total_load_time_ms as f64 / loads as f64
        };

        CacheStatsSnapshot {
            hits,
            misses,
            hit_ratio: percentage(hits, hits + misses),
            stale_serves: self.stale_serves.load(Ordering::Relaxed),
            loads,
            total_load_time_ms,
            avg_load_time_ms,
            sets,
            net_writes: sets.saturating_sub(delete_hits),
            tag_invalidations: self.tag_invalidations.load(Ordering::Relaxed),
            delete_hits,
            delete_misses,
            delete_hit_ratio: percentage(delete_hits, delete_hits + delete_misses),
            cleanup_runs: self.cleanup_runs.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stale_serves,
            &self.loads,
            &self.load_time_ms,
            &self.sets,
            &self.tag_invalidations,
            &self.delete_hits,
            &self.delete_misses,
            &self.cleanup_runs,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Logs a snapshot every `interval` until the returned task is aborted
    pub fn spawn_reporter(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let s = self.snapshot();
                tracing::debug!(
                    hits = s.hits,
                    misses = s.misses,
                    hit_ratio = format_args!("{:.2}", s.hit_ratio),
                    stale_served = s.stale_serves,
                    load_count = s.loads,
                    total_load_time_ms = s.total_load_time_ms,
                    avg_load_time_ms = format_args!("{:.4}", s.avg_load_time_ms),
                    net_writes = s.net_writes,
                    total_entries = s.sets,
                    tag_invalidations = s.tag_invalidations,
                    delete_hits = s.delete_hits,
                    delete_misses = s.delete_misses,
                    delete_hit_ratio = format_args!("{:.2}", s.delete_hit_ratio),
                    cleanup_runs = s.cleanup_runs,
                    "cache stats"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_ratios() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_load(Duration::from_millis(30));
        stats.record_load(Duration::from_millis(10));
        stats.record_delete_hit();
        stats.record_delete_miss();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hit_ratio, 75.0);
        assert_eq!(snapshot.avg_load_time_ms, 20.0);
        assert_eq!(snapshot.delete_hit_ratio, 50.0);
    }

    #[test]
    fn test_empty_snapshot_has_zero_ratios() {
        let snapshot = CacheStats::new().snapshot();
        assert_eq!(snapshot, CacheStatsSnapshot::default());
    }

    #[test]
    fn test_net_writes_never_underflow() {
        let stats = CacheStats::new();
        stats.record_set();
        stats.record_delete_hit();
        stats.record_delete_hit();

        assert_eq!(stats.snapshot().net_writes, 0);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_set();
        stats.record_cleanup();

        stats.reset();
        assert_eq!(stats.snapshot(), CacheStatsSnapshot::default());
    }

    #[tokio::test]
    async fn test_reporter_runs_until_aborted() {
        let stats = Arc::new(CacheStats::new());
        let reporter = Arc::clone(&stats).spawn_reporter(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(!reporter.is_finished());

        reporter.abort();
        assert!(reporter.await.unwrap_err().is_cancelled());
    }
}
