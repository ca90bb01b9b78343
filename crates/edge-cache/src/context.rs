//! Explicit cache context.

use std::sync::Arc;

use edge_core::CacheConfig;
use edge_data::{EdgeCache, ObjectStore};
use edge_observability::CacheMetrics;

use crate::lock::KeyedMutex;

/// Everything the cache components need from the hosting request.
///
/// Passed to [`IncrementalCache`](crate::IncrementalCache) and
/// [`TagCache`](crate::TagCache) at construction; cheap to clone. Clones
/// share one write lock set, so every `TagCache` built from them serializes
/// manifest writes against the others.
#[derive(Clone)]
pub struct CacheContext {
    /// Durable tier.
    pub store: Arc<dyn ObjectStore>,
    /// Ephemeral tier.
    pub edge: Arc<dyn EdgeCache>,
    /// Adapter configuration.
    pub config: CacheConfig,
    /// Shared counters.
    pub metrics: Arc<CacheMetrics>,
    /// Manifest write locks shared by every clone.
    pub lock: KeyedMutex,
}

impl CacheContext {
    /// Create a context with fresh metrics.
    pub fn new(store: Arc<dyn ObjectStore>, edge: Arc<dyn EdgeCache>, config: CacheConfig) -> Self {
        Self {
            store,
            edge,
            config,
            metrics: Arc::new(CacheMetrics::new()),
            lock: KeyedMutex::new(),
        }
    }

    /// Share an existing metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Key prefix of all cache objects.
    pub fn cache_dir(&self) -> String {
        self.config.cache_dir()
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use edge_data::{MemoryEdgeCache, MemoryObjectStore};

    use super::*;

    #[tokio::test]
    async fn test_clones_share_lock() {
        let ctx = CacheContext::new(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryEdgeCache::new()),
            CacheConfig::new("b1"),
        );
        let copy = ctx.clone();

        let _guard = ctx.lock.lock("manifest").await;
        assert_eq!(copy.lock.len(), 1);
    }
}
