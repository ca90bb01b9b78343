//! End-to-end behavior of the incremental cache and tag cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edge_cache::{
    CacheContext, CacheKind, CacheSource, IncrementalCache, KeyedMutex, TagCache, TagManifest,
    TagWrite, FORCE_REVALIDATION,
};
use edge_core::{now_millis, CacheConfig};
use edge_data::{MemoryEdgeCache, MemoryObjectStore, ObjectMetadata, ObjectStore, StoreResult};
use futures::future::join_all;
use serde_json::json;

struct Env {
    store: Arc<MemoryObjectStore>,
    ctx: CacheContext,
}

fn env(build_id: &str) -> Env {
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = CacheContext::new(
        store.clone(),
        Arc::new(MemoryEdgeCache::new()),
        CacheConfig::new(build_id).with_bucket_prefix("site"),
    );
    Env { store, ctx }
}

/// Memory store that yields to the scheduler on every read and write.
struct SlowStore(MemoryObjectStore);

#[async_trait]
impl ObjectStore for SlowStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.0.get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, metadata: ObjectMetadata) -> StoreResult<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.0.put(key, bytes, metadata).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.0.delete(key).await
    }
}

async fn stored_manifest(env: &Env) -> TagManifest {
    let bytes = env
        .store
        .get("site/data-cache/_next_cache/cache-tags-manifest.cache")
        .await
        .unwrap()
        .unwrap();
    TagManifest::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let env = env("b1");
    let pages = IncrementalCache::new(env.ctx.clone());
    let tags = TagCache::new(&env.ctx);

    pages
        .set("/home", &json!({"html": "<h1>Hi</h1>"}), CacheKind::Page)
        .await
        .unwrap();
    let entry = pages.get("/home", CacheKind::Page).await.unwrap().unwrap();
    assert_eq!(entry.value["html"], "<h1>Hi</h1>");
    let original_last_modified = entry.last_modified;

    tags.write_tags(&[TagWrite::new("home-tag", "/home")])
        .await
        .unwrap();
    assert_eq!(tags.get_by_path("/home").await.unwrap(), vec!["home-tag"]);

    tags.write_tags(&[TagWrite::new("home-tag", "/home").revalidated_at(now_millis() + 1000)])
        .await
        .unwrap();
    assert_eq!(
        tags.get_last_modified("/home", Some(original_last_modified))
            .await
            .unwrap(),
        FORCE_REVALIDATION
    );
}

#[tokio::test]
async fn test_round_trip_reports_fresh_timestamp() {
    let env = env("b1");
    let pages = IncrementalCache::new(env.ctx.clone());
    let value = json!({"kind": "PAGE", "html": "<p>x</p>", "headers": {"x-a": "1"}, "status": 200});

    let before = now_millis();
    pages.set("/blog/1", &value, CacheKind::Page).await.unwrap();
    let entry = pages.get("/blog/1", CacheKind::Page).await.unwrap().unwrap();

    assert_eq!(entry.value, value);
    assert!(entry.last_modified >= before);
}

#[tokio::test]
async fn test_caller_timestamp_is_overwritten() {
    let env = env("b1");
    let pages = IncrementalCache::new(env.ctx.clone());

    pages
        .set("/a", &json!({"html": "x", "lastModified": 1}), CacheKind::Page)
        .await
        .unwrap();
    let entry = pages.get("/a", CacheKind::Page).await.unwrap().unwrap();
    assert!(entry.last_modified > 1);
    assert_eq!(entry.value, json!({"html": "x"}));
}

#[tokio::test]
async fn test_builds_do_not_share_entries_or_tags() {
    let old = env("b1");
    let pages_b1 = IncrementalCache::new(old.ctx.clone());
    pages_b1
        .set("/home", &json!({"html": "old"}), CacheKind::Page)
        .await
        .unwrap();
    TagCache::new(&old.ctx)
        .write_tags(&[TagWrite::new("home-tag", "/home")])
        .await
        .unwrap();

    // Same bucket, new deployment.
    let mut ctx_b2 = old.ctx.clone();
    ctx_b2.config = CacheConfig::new("b2").with_bucket_prefix("site");
    ctx_b2.edge = Arc::new(MemoryEdgeCache::new());

    let pages_b2 = IncrementalCache::new(ctx_b2.clone());
    assert!(pages_b2.get("/home", CacheKind::Page).await.unwrap().is_none());
    assert!(TagCache::new(&ctx_b2)
        .get_by_path("/home")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_tag_index_symmetry() {
    let env = env("b1");
    let tags = TagCache::new(&env.ctx);

    let pairs = [("posts", "/blog"), ("posts", "/blog/1"), ("authors", "/blog/1")];
    for (tag, path) in pairs {
        tags.write_tags(&[TagWrite::new(tag, path)]).await.unwrap();
    }
    for (tag, path) in pairs {
        assert!(tags.get_by_path(path).await.unwrap().contains(&tag.to_string()));
        assert!(tags.get_by_tag(tag).await.unwrap().contains(&path.to_string()));
    }
    assert_eq!(tags.get_by_tag("posts").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_dedup_within_batch() {
    let env = env("b1");
    let tags = TagCache::new(&env.ctx);
    tags.write_tags(&[TagWrite::new("a", "p1"), TagWrite::new("a", "p2")])
        .await
        .unwrap();

    assert_eq!(tags.get_by_tag("a").await.unwrap(), vec!["/p1"]);
    let manifest = stored_manifest(&env).await;
    assert_eq!(manifest.revalidations.len(), 1);
    assert_eq!(manifest.revalidations[0].path, "b1/p1");
}

#[tokio::test]
async fn test_sentinel_is_not_persisted() {
    let env = env("b1");
    let tags = TagCache::new(&env.ctx);
    tags.write_tags(&[TagWrite::new("seed", "/seed")]).await.unwrap();
    tags.write_tags(&[TagWrite::new("a", "p").revalidated_at(-1)])
        .await
        .unwrap();

    let manifest = stored_manifest(&env).await;
    assert!(manifest.revalidations.iter().all(|r| r.tag != "b1/a"));
    assert!(manifest.revalidations.iter().all(|r| r.revalidated_at != Some(-1)));
}

#[tokio::test]
async fn test_staleness_override_window() {
    let env = env("b1");
    let tags = TagCache::new(&env.ctx);
    let l = 1_700_000_000_000;

    tags.write_tags(&[TagWrite::new("t", "/page").revalidated_at(l + 1)])
        .await
        .unwrap();

    assert_eq!(tags.get_last_modified("/page", Some(l)).await.unwrap(), -1);
    assert_eq!(tags.get_last_modified("/page", Some(l + 2)).await.unwrap(), l + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_write_tags_lose_nothing() {
    let env = env("b1");
    let lock = KeyedMutex::new();
    let n = 32;

    let writers: Vec<_> = (0..n)
        .map(|_| TagCache::new(&env.ctx).with_lock(lock.clone()))
        .collect();
    let tasks = writers.iter().enumerate().map(|(i, tags)| async move {
        tags.write_tags(&[TagWrite::new(format!("tag-{i}"), format!("/page/{i}"))])
            .await
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let manifest = stored_manifest(&env).await;
    assert_eq!(manifest.items.len(), n);
    assert_eq!(manifest.revalidations.len(), n);
    for i in 0..n {
        assert_eq!(
            writers[0].get_by_tag(&format!("tag-{i}")).await.unwrap(),
            vec![format!("/page/{i}")]
        );
    }
    assert!(lock.is_empty());
}

#[tokio::test]
async fn test_tag_caches_from_one_context_serialize_writes() {
    let ctx = CacheContext::new(
        Arc::new(SlowStore(MemoryObjectStore::new())),
        Arc::new(MemoryEdgeCache::new()),
        CacheConfig::new("b1"),
    );

    let tasks = (0..8).map(|i| {
        let ctx = ctx.clone();
        async move {
            TagCache::new(&ctx)
                .write_tags(&[TagWrite::new(format!("t{i}"), "/p")])
                .await
        }
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let found = TagCache::new(&ctx).get_by_path("/p").await.unwrap();
    assert_eq!(found.len(), 8);
    assert!(ctx.lock.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_write_tags_from_spawned_tasks() {
    let env = env("b1");
    let tags = Arc::new(TagCache::new(&env.ctx));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let tags = Arc::clone(&tags);
            tokio::spawn(async move {
                tags.write_tags(&[TagWrite::new(format!("t{i}"), "/shared")])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut found = tags.get_by_path("/shared").await.unwrap();
    found.sort();
    let mut expected: Vec<String> = (0..16).map(|i| format!("t{i}")).collect();
    expected.sort();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_durable_outage_degrades_to_always_miss() {
    let env = env("b1");
    let pages = IncrementalCache::new(env.ctx.clone());
    pages
        .set("/home", &json!({"html": "hi"}), CacheKind::Page)
        .await
        .unwrap();

    // Fresh edge node, storage down.
    let mut ctx = env.ctx.clone();
    ctx.edge = Arc::new(MemoryEdgeCache::new());
    env.store.fail_gets(true);
    let cold = IncrementalCache::new(ctx);

    assert!(cold.get("/home", CacheKind::Page).await.unwrap().is_none());
    assert_eq!(cold.context().metrics.snapshot().read_errors, 1);

    env.store.fail_gets(false);
    let entry = cold.get("/home", CacheKind::Page).await.unwrap().unwrap();
    assert_eq!(entry.source, CacheSource::Storage);
}
