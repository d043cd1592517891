//! Cache error taxonomy

use std::fmt;

use thiserror::Error;

use super::adapter::AdapterError;

/// Public cache operation, used to annotate errors with context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    SoftDelete,
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOperation::Get => write!(f, "get"),
            CacheOperation::Set => write!(f, "set"),
            CacheOperation::Delete => write!(f, "delete"),
            CacheOperation::SoftDelete => write!(f, "soft_delete"),
        }
    }
}

/// Errors surfaced by the cache orchestrator
///
/// The type is `Clone` so a single outcome can be handed to every caller
/// waiting on the same in-flight load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("entry not found")]
    EntryNotFound,

    #[error("stale response")]
    StaleResponse,

    #[error("loader function is not configured")]
    LoaderNil,

    #[error("missing deletion keys or tags")]
    InvalidDeletionArgs,

    #[error("loader failed: {message}")]
    LoaderFailed { message: String },

    #[error("invalid cache entry: {message}")]
    InvalidEntry { message: String },

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("cache {operation} failed for key={key:?}: {source}")]
    Operation {
        operation: CacheOperation,
        key: String,
        source: Box<CacheError>,
    },

    #[error("{}", join_messages(.0))]
    Joined(Vec<CacheError>),
}

fn join_messages(errors: &[CacheError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl CacheError {
    pub fn loader_failed(error: anyhow::Error) -> Self {
        Self::LoaderFailed {
            message: format!("{:#}", error),
        }
    }

    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Wraps the error with the operation and key it happened in
    pub fn in_operation(self, operation: CacheOperation, key: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// Joins several errors into one, `None` when there is nothing to join
    pub fn join(errors: Vec<CacheError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self::Joined(errors))
        }
    }

    /// Returns the innermost error, skipping operation context
    pub fn root(&self) -> &CacheError {
        let mut current = self;
        while let CacheError::Operation { source, .. } = current {
            current = source;
        }
        current
    }

    /// True when the key is absent from the cache
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            CacheError::EntryNotFound | CacheError::Adapter(AdapterError::NotFound)
        )
    }

    /// True when the entry expired beyond any usable stale window
    pub fn is_stale(&self) -> bool {
        matches!(self.root(), CacheError::StaleResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_display() {
        let error = CacheError::EntryNotFound.in_operation(CacheOperation::Get, "user:1");
        assert_eq!(
            error.to_string(),
            "cache get failed for key=\"user:1\": entry not found"
        );
    }

    #[test]
    fn test_root_skips_nested_context() {
        let error = CacheError::from(AdapterError::backend("disk full"))
            .in_operation(CacheOperation::Set, "k")
            .in_operation(CacheOperation::Get, "k");

        assert_eq!(
            error.root(),
            &CacheError::Adapter(AdapterError::backend("disk full"))
        );
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_not_found_covers_adapter_sentinel() {
        assert!(CacheError::EntryNotFound.is_not_found());
        assert!(CacheError::Adapter(AdapterError::NotFound).is_not_found());
        assert!(!CacheError::StaleResponse.is_not_found());
        assert!(CacheError::StaleResponse.is_stale());
    }

    #[test]
    fn test_join() {
        assert!(CacheError::join(vec![]).is_none());

        let joined = CacheError::join(vec![
            CacheError::EntryNotFound.in_operation(CacheOperation::Delete, "a"),
            CacheError::EntryNotFound.in_operation(CacheOperation::Delete, "b"),
        ])
        .unwrap();

        assert_eq!(
            joined.to_string(),
            "cache delete failed for key=\"a\": entry not found\n\
             cache delete failed for key=\"b\": entry not found"
        );
    }

    #[test]
    fn test_loader_failed_keeps_context_chain() {
        let error = CacheError::loader_failed(
            anyhow::anyhow!("connection refused").context("fetching todo 7"),
        );
        assert_eq!(
            error.to_string(),
            "loader failed: fetching todo 7: connection refused"
        );
    }
}
