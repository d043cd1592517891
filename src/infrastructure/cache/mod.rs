//! Cache infrastructure - adapters, deduplication, tag index and stats

mod factory;
mod sharded_memory;
mod single_flight;
mod stats;
mod tag_index;

pub use factory::{AdapterConfig, AdapterFactory, AdapterType};
pub use sharded_memory::{ShardedMemoryAdapter, ShardedMemoryConfig};
pub use single_flight::{FlightError, SingleFlight};
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use tag_index::{CleanupReport, TagIndex};
