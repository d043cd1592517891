//! Loader contract used to populate the cache on a miss

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

/// Produces the value for a key when the cache cannot serve it
///
/// The cache guarantees a single concurrent invocation per key; loaders only
/// need to be safe for concurrent calls on distinct keys.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Value>;
}

/// Adapts an async closure into a [`Loader`]
pub struct FnLoader<F> {
    f: F,
}

impl<F> fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn load(&self, key: &str) -> anyhow::Result<Value> {
        (self.f)(key.to_string()).await
    }
}

/// Builds a loader from an async closure taking the key
pub fn loader_fn<F, Fut>(f: F) -> FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnLoader { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_loader_fn_receives_key() {
        let loader = loader_fn(|key| async move { Ok(json!(format!("loaded:{}", key))) });

        let value = loader.load("todo:1").await.unwrap();
        assert_eq!(value, json!("loaded:todo:1"));
    }

    #[tokio::test]
    async fn test_loader_fn_propagates_error() {
        let loader = loader_fn(|_key| async move { Err(anyhow::anyhow!("upstream down")) });

        let error = loader.load("todo:1").await.unwrap_err();
        assert_eq!(error.to_string(), "upstream down");
    }
}
