//! Seeding the durable store from build output.
//!
//! The build writes prerendered payloads under `<outputDir>/cache`:
//!
//! - `<buildId>/<key...>.cache` for pages
//! - `__fetch/<buildId>/<key...>` for fetch responses
//!
//! [`discover_cache_assets`] classifies those files and [`populate_cache`]
//! copies them to their object store keys, along with the tag manifest.

use std::path::{Component, Path, PathBuf};

use edge_core::{BuildId, CacheConfig, TAG_MANIFEST_FILE};
use edge_data::{ObjectMetadata, ObjectStore};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::CacheError;
use crate::key::{compute_cache_key, tag_manifest_key, KeyOptions, StorageKind, CACHE_SUFFIX, FETCH_NAMESPACE};
use crate::manifest::TagManifest;

/// Directory under the build output holding cache assets.
pub const OUTPUT_CACHE_DIR: &str = "cache";

/// Errors raised while seeding the cache.
#[derive(Debug, thiserror::Error)]
pub enum PopulateError {
    #[error("build output not found at {0}")]
    OutputNotFound(PathBuf),

    #[error("invalid path for a cache asset file: {0}")]
    InvalidAssetPath(String),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A prerendered payload found in the build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheAsset {
    /// Entry layout.
    pub kind: StorageKind,
    /// File on disk.
    pub full_path: PathBuf,
    /// Logical key, always starting with `/`.
    pub key: String,
    /// Build the payload belongs to.
    pub build_id: BuildId,
}

/// Outcome of [`populate_cache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub assets_written: usize,
    pub bytes_written: u64,
    pub manifest_written: bool,
}

/// Find every cache asset under `<output_dir>/cache`, sorted by path.
///
/// A tag manifest at the root of the cache directory is not an asset and is
/// skipped.
pub fn discover_cache_assets(output_dir: &Path) -> Result<Vec<CacheAsset>, PopulateError> {
    if !output_dir.is_dir() {
        return Err(PopulateError::OutputNotFound(output_dir.to_path_buf()));
    }

    let root = output_dir.join(OUTPUT_CACHE_DIR);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut assets = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|source| PopulateError::Walk {
            path: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_key(&root, entry.path())?;
        if relative == TAG_MANIFEST_FILE {
            continue;
        }

        let (kind, build_id, key) = classify(&relative)?;
        assets.push(CacheAsset {
            kind,
            full_path: entry.into_path(),
            key,
            build_id,
        });
    }

    Ok(assets)
}

/// Copy `assets` and the optional compiled tag manifest into `store`.
///
/// `on_asset` is called after each asset is written.
pub async fn populate_cache(
    assets: &[CacheAsset],
    store: &dyn ObjectStore,
    config: &CacheConfig,
    manifest: Option<&Path>,
    on_asset: &mut (dyn FnMut(&CacheAsset) + Send),
) -> Result<PopulateReport, PopulateError> {
    let prefix = config.cache_dir();
    let mut report = PopulateReport::default();

    for asset in assets {
        let bytes = read(&asset.full_path).await?;
        let options = KeyOptions {
            kind: asset.kind,
            build_id: &asset.build_id,
            prefix: &prefix,
        };
        let key = compute_cache_key(&asset.key, &options);

        report.bytes_written += bytes.len() as u64;
        store
            .put(&key, bytes, ObjectMetadata::with_id(asset.build_id.as_str()))
            .await
            .map_err(|e| CacheError::recoverable(format!("Failed to populate [{key}]"), e))?;
        report.assets_written += 1;
        tracing::debug!(key = %key, asset = %asset.full_path.display(), "populated cache asset");
        on_asset(asset);
    }

    if let Some(path) = manifest {
        let bytes = read(path).await?;
        // Refuse to publish a manifest the tag cache could not read.
        TagManifest::from_slice(&bytes)?;

        let key = tag_manifest_key(&prefix);
        report.bytes_written += bytes.len() as u64;
        store
            .put(&key, bytes, ObjectMetadata::with_id(config.build_id.as_str()))
            .await
            .map_err(|e| CacheError::recoverable("Failed to populate tags manifest", e))?;
        report.manifest_written = true;
        tracing::debug!(key = %key, "populated tags manifest");
    }

    tracing::info!(
        assets = report.assets_written,
        bytes = report.bytes_written,
        manifest = report.manifest_written,
        "cache populated"
    );
    Ok(report)
}

async fn read(path: &Path) -> Result<Vec<u8>, PopulateError> {
    tokio::fs::read(path).await.map_err(|source| PopulateError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn relative_key(root: &Path, path: &Path) -> Result<String, PopulateError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PopulateError::InvalidAssetPath(path.display().to_string()))?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            _ => return Err(PopulateError::InvalidAssetPath(relative.display().to_string())),
        }
    }
    Ok(segments.join("/"))
}

fn classify(relative: &str) -> Result<(StorageKind, BuildId, String), PopulateError> {
    let invalid = || PopulateError::InvalidAssetPath(relative.to_string());

    if relative.starts_with(FETCH_NAMESPACE) {
        let mut parts = relative.split('/');
        let namespace = parts.next();
        let build_id = parts.next().filter(|s| !s.is_empty());
        let key: Vec<&str> = parts.collect();
        return match (namespace, build_id) {
            (Some(FETCH_NAMESPACE), Some(build_id)) if !key.is_empty() => Ok((
                StorageKind::Fetch,
                BuildId::new(build_id),
                format!("/{}", key.join("/")),
            )),
            _ => Err(invalid()),
        };
    }

    let stem = relative.strip_suffix(CACHE_SUFFIX).ok_or_else(invalid)?;
    let (build_id, key) = stem.split_once('/').ok_or_else(invalid)?;
    if build_id.is_empty() || key.is_empty() {
        return Err(invalid());
    }
    Ok((StorageKind::Page, BuildId::new(build_id), format!("/{key}")))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use edge_data::MemoryObjectStore;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify_page() {
        let (kind, build, key) = classify("b1/blog/post.cache").unwrap();
        assert_eq!(kind, StorageKind::Page);
        assert_eq!(build.as_str(), "b1");
        assert_eq!(key, "/blog/post");
    }

    #[test]
    fn test_classify_fetch() {
        let (kind, build, key) = classify("__fetch/b1/abc123").unwrap();
        assert_eq!(kind, StorageKind::Fetch);
        assert_eq!(build.as_str(), "b1");
        assert_eq!(key, "/abc123");
    }

    #[test]
    fn test_classify_rejects_malformed() {
        for bad in ["b1.cache", "b1/page.html", "__fetch/b1", "__fetchx/b1/k", "/x.cache"] {
            assert!(
                matches!(classify(bad), Err(PopulateError::InvalidAssetPath(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_discover_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_cache_assets(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PopulateError::OutputNotFound(_)));
    }

    #[test]
    fn test_discover_assets_sorted_and_manifest_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(OUTPUT_CACHE_DIR);
        write(&cache, "b1/index.cache", "{}");
        write(&cache, "b1/blog/post.cache", "{}");
        write(&cache, "__fetch/b1/f00d", "{}");
        write(&cache, TAG_MANIFEST_FILE, r#"{"items":[]}"#);

        let assets = discover_cache_assets(dir.path()).unwrap();
        let keys: Vec<(&str, StorageKind)> =
            assets.iter().map(|a| (a.key.as_str(), a.kind)).collect();
        assert_eq!(
            keys,
            vec![
                ("/f00d", StorageKind::Fetch),
                ("/blog/post", StorageKind::Page),
                ("/index", StorageKind::Page),
            ]
        );
    }

    #[tokio::test]
    async fn test_populate_writes_codec_keys_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(OUTPUT_CACHE_DIR);
        write(&cache, "b1/index.cache", r#"{"html":"hi"}"#);
        write(&cache, "__fetch/b1/f00d", r#"{"body":"x"}"#);
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, r#"{"items":[{"tag":"b1/t","path":"b1/index"}]}"#).unwrap();

        let assets = discover_cache_assets(dir.path()).unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let config = CacheConfig::new("b1").with_bucket_prefix("bucket");
        let mut seen = 0;
        let report = populate_cache(
            &assets,
            store.as_ref(),
            &config,
            Some(&manifest_path),
            &mut |_| seen += 1,
        )
        .await
        .unwrap();

        assert_eq!(seen, 2);
        assert_eq!(report.assets_written, 2);
        assert!(report.manifest_written);
        assert_eq!(
            store.keys(),
            vec![
                "bucket/data-cache/_next_cache/__fetch/b1/f00d".to_string(),
                "bucket/data-cache/_next_cache/b1/index.cache".to_string(),
                "bucket/data-cache/_next_cache/cache-tags-manifest.cache".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_populate_rejects_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, "nope").unwrap();

        let store = MemoryObjectStore::new();
        let err = populate_cache(
            &[],
            &store,
            &CacheConfig::new("b1"),
            Some(&manifest_path),
            &mut |_| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PopulateError::Cache(CacheError::Serialization(_))));
        assert!(store.keys().is_empty());
    }
}
