//! In-process backends for development and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use http::Request;

use crate::edge::EdgeCache;
use crate::error::{StoreError, StoreResult};
use crate::store::{ObjectMetadata, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    metadata: ObjectMetadata,
}

/// In-memory object store.
///
/// Reads and writes can be made to fail to exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Raw bytes stored at `key`.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.get(key).map(|o| o.bytes.clone())
    }

    /// Metadata stored at `key`.
    pub fn metadata(&self, key: &str) -> Option<ObjectMetadata> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.get(key).map(|o| o.metadata.clone())
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("get {key}")));
        }
        Ok(self.object(key))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, metadata: ObjectMetadata) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("put {key}")));
        }
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.insert(key.to_string(), StoredObject { bytes, metadata });
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.remove(key);
        Ok(())
    }
}

/// In-memory edge cache.
#[derive(Debug, Default)]
pub struct MemoryEdgeCache {
    // (cache name, request URL) -> body
    entries: RwLock<HashMap<(String, String), Vec<u8>>>,
    fail_all: AtomicBool,
}

impl MemoryEdgeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Body stored for `url` in `cache_name`.
    pub fn entry(&self, cache_name: &str, url: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(cache_name.to_string(), url.to_string()))
            .cloned()
    }

    /// Number of stored entries across all caches.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, as an edge node eviction would.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("edge cache".to_string()));
        }
        Ok(())
    }
}

fn entry_key(cache_name: &str, request: &Request<()>) -> (String, String) {
    (cache_name.to_string(), request.uri().to_string())
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn lookup(&self, cache_name: &str, request: &Request<()>) -> StoreResult<Option<Vec<u8>>> {
        self.check()?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&entry_key(cache_name, request)).cloned())
    }

    async fn put(&self, cache_name: &str, request: &Request<()>, body: Vec<u8>) -> StoreResult<()> {
        self.check()?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry_key(cache_name, request), body);
        Ok(())
    }

    async fn delete(&self, cache_name: &str, request: &Request<()>) -> StoreResult<bool> {
        self.check()?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(&entry_key(cache_name, request)).is_some())
    }
}
