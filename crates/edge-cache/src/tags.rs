//! Tag cache backed by the tag manifest.

use std::sync::Arc;

use edge_core::{now_millis, BuildId};
use edge_observability::CacheMetrics;

use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::lock::KeyedMutex;
use crate::manifest::{ManifestStore, TagWrite};

/// Name reported by [`TagCache::name`].
pub const TAG_CACHE_NAME: &str = "storage-tag-cache";

/// `get_last_modified` result forcing revalidation of an entry.
pub const FORCE_REVALIDATION: i64 = -1;

/// Tag-to-path index and on-demand revalidation tracker.
///
/// All operations take raw keys; build-id namespacing happens inside.
/// `write_tags` is serialized per manifest within the process through a
/// [`KeyedMutex`]. Writers in other processes can still race: the manifest
/// is overwritten whole, last writer wins.
pub struct TagCache {
    manifests: ManifestStore,
    build_id: BuildId,
    lock: KeyedMutex,
    metrics: Arc<CacheMetrics>,
}

impl TagCache {
    /// Create a tag cache using the context's lock set.
    pub fn new(ctx: &CacheContext) -> Self {
        Self {
            manifests: ManifestStore::new(Arc::clone(&ctx.store), &ctx.config),
            build_id: ctx.config.build_id.clone(),
            lock: ctx.lock.clone(),
            metrics: Arc::clone(&ctx.metrics),
        }
    }

    /// Replace the lock set, e.g. to share one across contexts.
    pub fn with_lock(mut self, lock: KeyedMutex) -> Self {
        self.lock = lock;
        self
    }

    /// Implementation name.
    pub fn name(&self) -> &'static str {
        TAG_CACHE_NAME
    }

    /// Tags associated with `path`.
    pub async fn get_by_path(&self, path: &str) -> CacheResult<Vec<String>> {
        tracing::debug!(path, "tag cache get_by_path");
        let manifest = self.manifests.load_for_read().await?;
        let tags = manifest.tags_for_path(&self.build_id, path);
        if tags.is_empty() {
            tracing::debug!(path, "no tags found for path");
        }
        Ok(tags)
    }

    /// Paths associated with `tag`.
    pub async fn get_by_tag(&self, tag: &str) -> CacheResult<Vec<String>> {
        tracing::debug!(tag, "tag cache get_by_tag");
        let manifest = self.manifests.load_for_read().await?;
        let paths = manifest.paths_for_tag(&self.build_id, tag);
        if paths.is_empty() {
            tracing::debug!(tag, "no paths found for tag");
        }
        Ok(paths)
    }

    /// Adjust an entry's `lastModified` for on-demand revalidation.
    ///
    /// Returns [`FORCE_REVALIDATION`] when a tag of `key` was revalidated
    /// after `last_modified`. Otherwise returns `last_modified`, or the
    /// current time when none was given.
    pub async fn get_last_modified(&self, key: &str, last_modified: Option<i64>) -> CacheResult<i64> {
        tracing::debug!(key, ?last_modified, "tag cache get_last_modified");
        let manifest = self.manifests.load_for_read().await?;

        if manifest.is_revalidated_after(&self.build_id, key, last_modified.unwrap_or(0)) {
            tracing::debug!(key, "force revalidation");
            self.metrics.record_forced_revalidation();
            return Ok(FORCE_REVALIDATION);
        }

        Ok(last_modified.unwrap_or_else(now_millis))
    }

    /// Record tag associations and revalidation times.
    ///
    /// Performs a locked read-modify-write of the manifest. Read and write
    /// failures are returned as recoverable errors; a manifest that cannot be
    /// parsed is never overwritten.
    pub async fn write_tags(&self, tags: &[TagWrite]) -> CacheResult<()> {
        tracing::debug!(count = tags.len(), "tag cache write_tags");

        let _guard = self.lock.lock(self.manifests.key()).await;

        let mut manifest = self.manifests.load().await.map_err(|e| match e {
            CacheError::Store(source) => {
                CacheError::recoverable("Failed to read tags manifest", source)
            }
            other => other,
        })?;

        let accepted = manifest.apply_writes(&self.build_id, tags, now_millis());
        if accepted == 0 {
            tracing::debug!("no tag writes accepted, manifest unchanged");
            return Ok(());
        }

        self.manifests.save(&manifest).await?;
        self.metrics.record_tag_write();
        tracing::debug!(accepted, "tags written");
        Ok(())
    }
}
