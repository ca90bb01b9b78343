//! Tag manifest document.
//!
//! One JSON document per bucket holds every tag/path association and every
//! revalidation event:
//!
//! ```json
//! {
//!   "items": [{ "tag": "b1/posts", "path": "b1/blog" }],
//!   "revalidations": [{ "tag": "b1/posts", "path": "b1/blog", "revalidatedAt": 1700000000000 }]
//! }
//! ```
//!
//! Tags and paths are stored namespaced with the build id, with repeated
//! separators collapsed. Rows written with an uncollapsed `b1//blog` path
//! still match on lookup.

use std::collections::HashMap;
use std::sync::Arc;

use edge_core::{collapse_separators, BuildId, CacheConfig};
use edge_data::{ObjectMetadata, ObjectStore};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::key::tag_manifest_key;

/// Reserved `revalidatedAt` value that is never persisted.
pub const REVALIDATION_SENTINEL: i64 = -1;

/// A tag/path association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagItem {
    pub tag: String,
    pub path: String,
}

/// A recorded on-demand revalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revalidation {
    pub tag: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revalidated_at: Option<i64>,
}

/// A tag write requested by the revalidation path (raw, not namespaced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWrite {
    pub tag: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revalidated_at: Option<i64>,
}

impl TagWrite {
    /// A write stamped with the current time when applied.
    pub fn new(tag: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            path: path.into(),
            revalidated_at: None,
        }
    }

    /// Set an explicit revalidation time.
    pub fn revalidated_at(mut self, at: i64) -> Self {
        self.revalidated_at = Some(at);
        self
    }
}

/// The tag manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagManifest {
    #[serde(default)]
    pub items: Vec<TagItem>,
    #[serde(default)]
    pub revalidations: Vec<Revalidation>,
}

impl TagItem {
    fn matches(&self, tag: &str, path: &str) -> bool {
        collapse_separators(&self.tag) == tag && collapse_separators(&self.path) == path
    }
}

impl TagManifest {
    /// Empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial manifest from build-time tag metadata.
    pub fn from_meta<I>(build_id: &BuildId, meta: I) -> Self
    where
        I: IntoIterator<Item = TagItem>,
    {
        let mut manifest = Self::new();
        for item in meta {
            manifest.add_item(TagItem {
                tag: build_id.namespace(&item.tag),
                path: build_id.namespace(&item.path),
            });
        }
        manifest
    }

    /// Parse a manifest document.
    pub fn from_slice(bytes: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize the manifest document.
    pub fn to_vec(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Tags associated with raw `path`.
    pub fn tags_for_path(&self, build_id: &BuildId, path: &str) -> Vec<String> {
        let path = build_id.namespace(path);
        self.items
            .iter()
            .filter(|item| collapse_separators(&item.path) == path)
            .map(|item| build_id.strip(&item.tag).to_string())
            .collect()
    }

    /// Paths associated with raw `tag`.
    pub fn paths_for_tag(&self, build_id: &BuildId, tag: &str) -> Vec<String> {
        let tag = build_id.namespace(tag);
        self.items
            .iter()
            .filter(|item| collapse_separators(&item.tag) == tag)
            .map(|item| build_id.strip_path(&item.path))
            .collect()
    }

    /// Whether any tag of raw `key` was revalidated after `last_modified`.
    pub fn is_revalidated_after(&self, build_id: &BuildId, key: &str, last_modified: i64) -> bool {
        let path = build_id.namespace(key);
        self.revalidations.iter().any(|reval| {
            let tag = collapse_separators(&reval.tag);
            let tagged = self.items.iter().any(|item| item.matches(&tag, &path));
            tagged && reval.revalidated_at.is_some_and(|at| at > last_modified)
        })
    }

    /// Merge a batch of tag writes.
    ///
    /// Within the batch the first write of each tag wins; writes carrying
    /// [`REVALIDATION_SENTINEL`] are skipped. Accepted writes add their
    /// association to `items` (once) and replace the revalidation recorded
    /// for the same tag and path. Returns how many writes were accepted.
    pub fn apply_writes(&mut self, build_id: &BuildId, writes: &[TagWrite], now: i64) -> usize {
        let mut seen_tags: Vec<&str> = Vec::new();
        let mut accepted = Vec::new();
        for write in writes {
            if write.revalidated_at == Some(REVALIDATION_SENTINEL) {
                continue;
            }
            if seen_tags.contains(&write.tag.as_str()) {
                continue;
            }
            seen_tags.push(&write.tag);
            accepted.push(Revalidation {
                tag: build_id.namespace(&write.tag),
                path: build_id.namespace(&write.path),
                revalidated_at: Some(write.revalidated_at.unwrap_or(now)),
            });
        }

        let mut index: HashMap<(String, String), usize> = self
            .revalidations
            .iter()
            .enumerate()
            .map(|(i, r)| ((collapse_separators(&r.tag), collapse_separators(&r.path)), i))
            .collect();

        for reval in &accepted {
            self.add_item(TagItem {
                tag: reval.tag.clone(),
                path: reval.path.clone(),
            });

            let composite = (reval.tag.clone(), reval.path.clone());
            match index.get(&composite) {
                Some(&i) => self.revalidations[i] = reval.clone(),
                None => {
                    index.insert(composite, self.revalidations.len());
                    self.revalidations.push(reval.clone());
                }
            }
        }

        accepted.len()
    }

    fn add_item(&mut self, item: TagItem) {
        if !self.items.iter().any(|i| i.matches(&item.tag, &item.path)) {
            self.items.push(item);
        }
    }
}

/// Loads and stores the tag manifest in the durable tier.
#[derive(Clone)]
pub struct ManifestStore {
    store: Arc<dyn ObjectStore>,
    key: String,
    build_id: BuildId,
}

impl ManifestStore {
    /// Manifest location for `config` in `store`.
    pub fn new(store: Arc<dyn ObjectStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            key: tag_manifest_key(&config.cache_dir()),
            build_id: config.build_id.clone(),
        }
    }

    /// Object key of the manifest. Also its lock identity.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the manifest; a missing document is an empty manifest.
    ///
    /// Transport and parse errors are returned.
    pub async fn load(&self) -> CacheResult<TagManifest> {
        match self.store.get(&self.key).await? {
            Some(bytes) => {
                tracing::debug!(key = %self.key, "tags manifest hit from storage");
                TagManifest::from_slice(&bytes)
            }
            None => {
                tracing::debug!(key = %self.key, "tags manifest not found, using empty manifest");
                Ok(TagManifest::new())
            }
        }
    }

    /// Load for reading: transport failures degrade to an empty manifest.
    pub async fn load_for_read(&self) -> CacheResult<TagManifest> {
        match self.load().await {
            Err(CacheError::Store(e)) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read tags manifest");
                Ok(TagManifest::new())
            }
            other => other,
        }
    }

    /// Overwrite the whole manifest document.
    pub async fn save(&self, manifest: &TagManifest) -> CacheResult<()> {
        let bytes = manifest.to_vec()?;
        self.store
            .put(&self.key, bytes, ObjectMetadata::with_id(self.build_id.as_str()))
            .await
            .map_err(|e| CacheError::recoverable("Failed to write tags manifest", e))?;
        tracing::debug!(key = %self.key, "tags manifest written to storage");
        Ok(())
    }
}
