//! Tag to key index used for bulk invalidation

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::Mutex;

/// Outcome of a tag index reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub tags_scanned: usize,
    pub keys_dropped: usize,
    pub tags_removed: usize,
}

/// Maps tags to the keys set under them
///
/// Registration is additive and lazy: keys are never removed on delete, only
/// by [`TagIndex::retain`]. The lock is async because `retain` awaits the
/// predicate while holding it.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: Mutex<HashMap<String, Vec<String>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key` to the list of every tag in `tags`
    pub async fn register<S: AsRef<str>>(&self, key: &str, tags: &[S]) {
        if tags.is_empty() {
            return;
        }

        let mut index = self.tags.lock().await;
        for tag in tags {
            index
                .entry(tag.as_ref().to_string())
                .or_default()
                .push(key.to_string());
        }
    }

    /// Keys registered under any of `tags`, in tag then insertion order
    pub async fn keys_for<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        let index = self.tags.lock().await;
        tags.iter()
            .filter_map(|tag| index.get(tag.as_ref()))
            .flatten()
            .cloned()
            .collect()
    }

    pub async fn keys(&self, tag: &str) -> Option<Vec<String>> {
        self.tags.lock().await.get(tag).cloned()
    }

    pub async fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tags.lock().await.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Keeps only the keys for which `keep` resolves to true and drops tags
    /// left without keys. The index stays locked for the whole pass.
    pub async fn retain<F, Fut>(&self, mut keep: F) -> CleanupReport
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut index = self.tags.lock().await;
        let mut report = CleanupReport {
            tags_scanned: index.len(),
            ..Default::default()
        };

        let tags: Vec<String> = index.keys().cloned().collect();
        for tag in tags {
            let keys = index.get(&tag).cloned().unwrap_or_default();
            let mut surviving = Vec::with_capacity(keys.len());

            for key in keys {
                if keep(key.clone()).await {
                    surviving.push(key);
                } else {
                    report.keys_dropped += 1;
                }
            }

            if surviving.is_empty() {
                index.remove(&tag);
                report.tags_removed += 1;
            } else {
                index.insert(tag, surviving);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_additive() {
        let index = TagIndex::new();

        index.register("p1", &["products"]).await;
        index.register("p1", &["products", "featured"]).await;
        index.register("p2", &["products"]).await;

        assert_eq!(
            index.keys("products").await,
            Some(vec!["p1".to_string(), "p1".to_string(), "p2".to_string()])
        );
        assert_eq!(index.keys("featured").await, Some(vec!["p1".to_string()]));
        assert_eq!(index.tags().await, vec!["featured", "products"]);
    }

    #[tokio::test]
    async fn test_register_without_tags_creates_nothing() {
        let index = TagIndex::new();
        index.register::<&str>("p1", &[]).await;

        assert!(index.tags().await.is_empty());
    }

    #[tokio::test]
    async fn test_keys_for_unknown_tag_is_empty() {
        let index = TagIndex::new();
        index.register("p1", &["products"]).await;

        assert_eq!(index.keys_for(&["users", "products"]).await, vec!["p1"]);
        assert!(index.keys_for(&["users"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_retain_drops_keys_and_empty_tags() {
        let index = TagIndex::new();
        index.register("p1", &["products", "featured"]).await;
        index.register("p2", &["products"]).await;

        let report = index.retain(|key| async move { key == "p2" }).await;

        assert_eq!(index.keys("products").await, Some(vec!["p2".to_string()]));
        assert_eq!(index.keys("featured").await, None);
        assert_eq!(
            report,
            CleanupReport {
                tags_scanned: 2,
                keys_dropped: 2,
                tags_removed: 1,
            }
        );
    }
}
