//! Cache entry with an absolute expiry

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Freshness of an entry relative to its expiry and a stale window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// `now < expires_at`
    Valid,
    /// `expires_at <= now < expires_at + stale_window`
    Stale,
    /// `now >= expires_at + stale_window`
    Expired,
}

/// Value stored through a storage adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    /// Expiration timestamp (millis since epoch)
    pub expires_at: u64,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl` from now
    pub fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: current_time_millis().saturating_add(ceil_millis(ttl)),
        }
    }

    pub fn state(&self, stale_window: Duration) -> EntryState {
        self.state_at(current_time_millis(), stale_window)
    }

    pub fn state_at(&self, now_millis: u64, stale_window: Duration) -> EntryState {
        if now_millis < self.expires_at {
            EntryState::Valid
        } else if now_millis < self.expires_at.saturating_add(ceil_millis(stale_window)) {
            EntryState::Stale
        } else {
            EntryState::Expired
        }
    }

    /// True once the TTL has elapsed, regardless of any stale window
    pub fn is_expired(&self) -> bool {
        self.state(Duration::ZERO) != EntryState::Valid
    }
}

/// Whole milliseconds, rounding any sub-millisecond remainder up
fn ceil_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
