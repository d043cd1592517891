//! Per-call options for cache reads and deletions

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::CacheError;
use super::loader::Loader;

/// Options for a single `get` call
#[derive(Clone, Default)]
pub struct GetOptions {
    /// Loader used on a miss, a stale hit, or a bypass
    pub loader: Option<Arc<dyn Loader>>,
    /// Grace period after expiry during which a read triggers a refresh
    pub stale_response_ttl: Duration,
    /// Skip the storage adapter and go straight to the loader
    pub bypass: bool,
}

impl fmt::Debug for GetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetOptions")
            .field("loader", &self.loader.is_some())
            .field("stale_response_ttl", &self.stale_response_ttl)
            .field("bypass", &self.bypass)
            .finish()
    }
}

impl GetOptions {
    /// Attaches a loader
    pub fn with_loader(self, loader: impl Loader + 'static) -> Self {
        self.with_shared_loader(Arc::new(loader))
    }

    /// Attaches a loader that is already shared
    pub fn with_shared_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the stale-serve window
    pub fn with_stale_response(mut self, stale_ttl: Duration) -> Self {
        self.stale_response_ttl = stale_ttl;
        self
    }

    /// Bypasses the storage adapter
    pub fn with_bypass(mut self) -> Self {
        self.bypass = true;
        self
    }

    /// Checks the combination of options
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.bypass && self.loader.is_none() {
            return Err(CacheError::LoaderNil);
        }
        Ok(())
    }
}

/// What a `delete` call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope<'a> {
    Keys(&'a [String]),
    Tags(&'a [String]),
}

/// Options for a single `delete` call
///
/// Keys take precedence over tags when both are given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub keys: Vec<String>,
    pub tags: Vec<String>,
}

impl DeleteOptions {
    /// Deletes the given keys
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            tags: Vec::new(),
        }
    }

    /// Deletes every key registered under the given tags
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Vec::new(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolves which selector applies
    pub fn scope(&self) -> Result<DeleteScope<'_>, CacheError> {
        if !self.keys.is_empty() {
            Ok(DeleteScope::Keys(&self.keys))
        } else if !self.tags.is_empty() {
            Ok(DeleteScope::Tags(&self.tags))
        } else {
            Err(CacheError::InvalidDeletionArgs)
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        self.scope().map(|_| ())
    }
}
