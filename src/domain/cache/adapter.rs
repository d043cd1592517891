//! Storage adapter trait definition

use async_trait::async_trait;
use thiserror::Error;

use super::entry::CacheEntry;

#[cfg(test)]
use mockall::automock;

/// Errors reported by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The key is not present in the backend
    #[error("entry not found")]
    NotFound,

    #[error("serialization failed: {message}")]
    Serialization { message: String },

    #[error("backend failure: {message}")]
    Backend { message: String },
}

impl AdapterError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key-value storage backend consumed by the cache
///
/// Implementations must be safe for concurrent use. Expiry is owned by the
/// cache layer: adapters store and return entries verbatim, and report a
/// missing key (on get or delete) as [`AdapterError::NotFound`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetches the entry stored under `key`
    async fn get(&self, key: &str) -> Result<CacheEntry, AdapterError>;

    /// Stores `entry` under `key`, replacing any previous entry
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), AdapterError>;

    /// Removes the entry stored under `key`
    async fn delete(&self, key: &str) -> Result<(), AdapterError>;
}
