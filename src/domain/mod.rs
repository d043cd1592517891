//! Domain layer - Cache entries, storage contract and errors

pub mod cache;
pub mod error;

pub use cache::{
    loader_fn, AdapterError, CacheEntry, CacheError, CacheOperation, DeleteOptions, GetOptions,
    Loader, StorageAdapter,
};
pub use error::DomainError;
