//! Two-tier incremental cache for page and fetch payloads.
//!
//! Reads try the edge cache first and fall back to the durable store,
//! backfilling the edge cache in the background. Writes go to both tiers;
//! only the durable write must succeed.

use std::sync::Arc;

use edge_core::now_millis;
use edge_data::{edge_cache_request, EdgeCache, ObjectMetadata};
use edge_observability::CacheMetrics;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::key::{compute_cache_key, hot_cache_key, CacheKind, KeyOptions, StorageKind};

/// Name reported by [`IncrementalCache::name`].
pub const INCREMENTAL_CACHE_NAME: &str = "storage-incremental-cache";

/// Payload field carrying the write timestamp.
pub const LAST_MODIFIED_FIELD: &str = "lastModified";

/// Tier that served a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Edge cache.
    Hot,
    /// Durable object store.
    Storage,
}

impl std::fmt::Display for CacheSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hot => write!(f, "HOT"),
            Self::Storage => write!(f, "STORAGE"),
        }
    }
}

/// A cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Payload as written, without the `lastModified` field.
    pub value: Value,
    /// Write time in epoch milliseconds.
    pub last_modified: i64,
    /// Tier that served the read.
    pub source: CacheSource,
}

impl CacheEntry {
    /// Deserialize the payload.
    pub fn value_as<T: DeserializeOwned>(&self) -> CacheResult<T> {
        Ok(T::deserialize(&self.value)?)
    }
}

/// Incremental cache over an edge cache and a durable object store.
pub struct IncrementalCache {
    ctx: CacheContext,
}

impl IncrementalCache {
    /// Create a cache using `ctx`.
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }

    /// Implementation name.
    pub fn name(&self) -> &'static str {
        INCREMENTAL_CACHE_NAME
    }

    /// The context this cache was built with.
    pub fn context(&self) -> &CacheContext {
        &self.ctx
    }

    /// Durable store key of `key`.
    pub fn storage_key(&self, key: &str, kind: StorageKind) -> String {
        let prefix = self.ctx.cache_dir();
        compute_cache_key(key, &KeyOptions::from_config(kind, &self.ctx.config, &prefix))
    }

    /// Look up an entry.
    ///
    /// Misses and every storage or decode failure yield `Ok(None)`; the
    /// caller renders from scratch. Only an unsupported `kind` is an error.
    pub async fn get(&self, key: &str, kind: CacheKind) -> CacheResult<Option<CacheEntry>> {
        tracing::debug!(key, %kind, "incremental cache get");
        let storage_kind = kind.storage_kind()?;

        match self.read(key, storage_kind).await {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_ignorable() => {
                tracing::debug!(key, "MISS");
                self.metrics().record_miss();
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "failed to get from cache");
                self.metrics().record_read_error();
                self.metrics().record_miss();
                Ok(None)
            }
        }
    }

    /// Store an entry in both tiers.
    ///
    /// The payload must serialize to a JSON object; its `lastModified` field
    /// is overwritten with the current time. An edge cache failure is
    /// logged and ignored. A durable store failure is returned as
    /// [`CacheError::Recoverable`].
    pub async fn set<T>(&self, key: &str, value: &T, kind: CacheKind) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        tracing::debug!(key, %kind, "incremental cache set");
        let storage_kind = kind.storage_kind()?;
        let bytes = encode(value, now_millis())?;

        if let Err(e) = self.write_hot(key, storage_kind, bytes.clone()).await {
            tracing::warn!(key, error = %e, "failed to write edge cache");
        }

        let storage_key = self.storage_key(key, storage_kind);
        let metadata = ObjectMetadata::with_id(self.ctx.config.build_id.as_str());
        if let Err(e) = self.ctx.store.put(&storage_key, bytes, metadata).await {
            self.metrics().record_write_failure();
            return Err(CacheError::recoverable(format!("Failed to set cache [{key}]"), e));
        }

        self.metrics().record_write();
        tracing::debug!(key, storage_key = %storage_key, "written to storage");
        Ok(())
    }

    /// Deletion is unsupported: entries are invalidated through the tag
    /// cache. This only logs and never touches storage.
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        tracing::debug!(key, "incremental cache delete ignored");
        Ok(())
    }

    async fn read(&self, key: &str, kind: StorageKind) -> CacheResult<CacheEntry> {
        if let Some(entry) = self.read_hot(key, kind).await {
            tracing::debug!(key, source = %CacheSource::Hot, "HIT");
            self.metrics().record_hot_hit();
            return Ok(entry);
        }

        let storage_key = self.storage_key(key, kind);
        let Some(bytes) = self.ctx.store.get(&storage_key).await? else {
            return Err(CacheError::NotFound {
                key: key.to_string(),
            });
        };
        let entry = self.decode(&bytes, CacheSource::Storage)?;
        tracing::debug!(key, source = %CacheSource::Storage, "HIT");
        self.metrics().record_storage_hit();

        self.backfill(key, kind, bytes);
        Ok(entry)
    }

    async fn read_hot(&self, key: &str, kind: StorageKind) -> Option<CacheEntry> {
        let request = edge_cache_request(&hot_cache_key(key, kind)).ok()?;
        let cache_name = self.ctx.config.edge_cache_name();
        match self.ctx.edge.lookup(&cache_name, &request).await {
            Ok(Some(bytes)) => match self.decode(&bytes, CacheSource::Hot) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(key, error = %e, "unreadable edge cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key, "edge cache miss, falling back to storage");
                None
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "edge cache unavailable");
                None
            }
        }
    }

    async fn write_hot(&self, key: &str, kind: StorageKind, bytes: Vec<u8>) -> CacheResult<()> {
        let request = edge_cache_request(&hot_cache_key(key, kind))?;
        let cache_name = self.ctx.config.edge_cache_name();
        self.ctx.edge.put(&cache_name, &request, bytes).await?;
        Ok(())
    }

    // Copies a storage hit into the edge cache without blocking the read.
    fn backfill(&self, key: &str, kind: StorageKind, bytes: Vec<u8>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key, "no runtime, skipping edge cache backfill");
            return;
        };

        let edge: Arc<dyn EdgeCache> = Arc::clone(&self.ctx.edge);
        let metrics = Arc::clone(&self.ctx.metrics);
        let cache_name = self.ctx.config.edge_cache_name();
        let key = key.to_string();
        let hot_key = hot_cache_key(&key, kind);

        runtime.spawn(async move {
            let result = match edge_cache_request(&hot_key) {
                Ok(request) => edge.put(&cache_name, &request, bytes).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    metrics.record_backfill();
                    tracing::debug!(key = %key, "edge cache backfilled");
                }
                Err(e) => {
                    metrics.record_backfill_failure();
                    tracing::debug!(key = %key, error = %e, "failed to backfill edge cache");
                }
            }
        });
    }

    fn decode(&self, bytes: &[u8], source: CacheSource) -> CacheResult<CacheEntry> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        let last_modified = value
            .as_object_mut()
            .and_then(|map| map.remove(LAST_MODIFIED_FIELD))
            .and_then(|v| parse_timestamp(&v))
            .unwrap_or_else(|| self.ctx.config.default_last_modified());

        Ok(CacheEntry {
            value,
            last_modified,
            source,
        })
    }

    fn metrics(&self) -> &CacheMetrics {
        &self.ctx.metrics
    }
}

fn encode<T>(value: &T, last_modified: i64) -> CacheResult<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.insert(LAST_MODIFIED_FIELD.to_string(), Value::from(last_modified));
            Ok(serde_json::to_vec(&map)?)
        }
        other => Err(CacheError::InvalidValue(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

// Older payloads may carry the timestamp as a string.
fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
