use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inmem_cache::{
    loader_fn, AdapterError, CacheError, CacheService, DeleteOptions, GetOptions,
    ShardedMemoryAdapter, StorageAdapter, DELETE_THRESHOLD,
};
use serde_json::{json, Value};

fn cache_with_adapter(ttl: Duration) -> (CacheService, Arc<ShardedMemoryAdapter>) {
    let adapter = Arc::new(ShardedMemoryAdapter::new());
    (CacheService::new(adapter.clone(), ttl), adapter)
}

fn versioned_loader(calls: Arc<AtomicUsize>) -> GetOptions {
    GetOptions::default().with_loader(loader_fn(move |key| {
        let calls = Arc::clone(&calls);
        async move {
            let version = calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<Value, anyhow::Error>(json!({ "key": key, "version": version }))
        }
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deletes_run_a_single_cleanup_pass() {
    let (cache, _) = cache_with_adapter(Duration::from_secs(60));
    cache.set("orphan", 1, &["orphans"]).await.unwrap();
    cache.set("alive", 2, &["live"]).await.unwrap();
    cache
        .delete(&DeleteOptions::with_keys(["orphan"]))
        .await
        .unwrap();

    let deletes = (0..DELETE_THRESHOLD).map(|i| {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .delete(&DeleteOptions::with_keys([format!("missing:{}", i)]))
                .await
        })
    });

    for result in futures::future::join_all(deletes).await {
        let error = result.unwrap().unwrap_err();
        assert!(error.result.failed[0].is_not_found());
        assert!(error.result.succeeded.is_empty());
    }

    assert_eq!(cache.stats().snapshot().cleanup_runs, 1);
    assert_eq!(cache.delete_threshold(), 0);
    assert_eq!(cache.tags().await, vec!["live".to_string()]);
}

#[tokio::test]
async fn soft_delete_then_read() {
    let (cache, adapter) = cache_with_adapter(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));

    cache.set("todo:1", json!({"title": "old"}), &["todos"]).await.unwrap();
    cache.soft_delete("todo:1").await.unwrap();

    let error = cache
        .get("todo:1", &GetOptions::default())
        .await
        .unwrap_err();
    assert_eq!(error.root(), &CacheError::EntryNotFound);

    // The plain read above evicted the tombstone; write it again to check the
    // loader path against a tombstone as well
    cache.set("todo:1", json!({"title": "old"}), &["todos"]).await.unwrap();
    cache.soft_delete("todo:1").await.unwrap();
    assert!(adapter.get("todo:1").await.unwrap().is_expired());

    let options = versioned_loader(calls.clone()).with_stale_response(Duration::from_secs(5));
    let value = cache.get("todo:1", &options).await.unwrap();

    assert_eq!(value, json!({"key": "todo:1", "version": 1}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn soft_deleted_entry_reloads_on_miss_path() {
    let (cache, _) = cache_with_adapter(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));

    cache.set("k", "v", &["t"]).await.unwrap();
    cache.soft_delete("k").await.unwrap();

    // Reading without a loader evicts the tombstone
    assert!(cache
        .get("k", &GetOptions::default())
        .await
        .unwrap_err()
        .is_not_found());

    let value = cache.get("k", &versioned_loader(calls.clone())).await.unwrap();
    assert_eq!(value["version"], json!(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_reads_share_one_refresh() {
    let (cache, _) = cache_with_adapter(Duration::from_millis(50));
    let calls = Arc::new(AtomicUsize::new(0));
    let options =
        versioned_loader(calls.clone()).with_stale_response(Duration::from_millis(500));

    cache.set("hot", "initial", &["hot-keys"]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reads = (0..8).map(|_| {
        let cache = cache.clone();
        let options = options.clone();
        tokio::spawn(async move { cache.get("hot", &options).await })
    });

    for result in futures::future::join_all(reads).await {
        assert_eq!(result.unwrap().unwrap()["version"], json!(1));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tag_invalidation_removes_every_tagged_key() {
    let (cache, adapter) = cache_with_adapter(Duration::from_secs(60));

    cache.set("user:1", "alice", &["users"]).await.unwrap();
    cache.set("user:2", "bob", &["users", "admins"]).await.unwrap();
    cache.set("product:1", "lamp", &["products"]).await.unwrap();

    let result = cache
        .delete(&DeleteOptions::with_tags(["users"]))
        .await
        .unwrap();
    assert!(result.is_complete());
    assert_eq!(result.succeeded.len(), 2);

    assert_eq!(adapter.get("user:1").await, Err(AdapterError::NotFound));
    assert_eq!(adapter.get("user:2").await, Err(AdapterError::NotFound));
    assert!(adapter.get("product:1").await.is_ok());

    // A second invalidation hits the stale references left in the index
    let error = cache
        .delete(&DeleteOptions::with_tags(["admins"]))
        .await
        .unwrap_err();
    assert!(error.result.succeeded.is_empty());
    assert!(error.to_string().contains("user:2"));
    assert!(error.result.failed[0].is_not_found());
}

#[tokio::test]
async fn application_key_named_cleanup_is_not_confused_with_cleanup() {
    let (cache, _) = cache_with_adapter(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));

    let value = cache
        .get("cleanup", &versioned_loader(calls.clone()))
        .await
        .unwrap();

    assert_eq!(value["key"], json!("cleanup"));
    assert_eq!(cache.stats().snapshot().cleanup_runs, 0);
}
