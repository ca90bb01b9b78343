//! Cache key codec.
//!
//! Maps a logical key (URL path or fetch identity) to an object store key:
//!
//! - page entries: `<prefix>/<buildId>/<rawKey>.cache`
//! - fetch entries: `<prefix>/__fetch/<buildId>/<rawKey>`
//!
//! Separators are collapsed, so no output ever contains an empty segment.

use std::fmt;

use edge_core::{BuildId, CacheConfig, TAG_MANIFEST_FILE};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Namespace segment of fetch entries.
pub const FETCH_NAMESPACE: &str = "__fetch";

/// Suffix of page entries.
pub const CACHE_SUFFIX: &str = ".cache";

/// Kind of cache entry requested by the rendering layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Rendered page payload.
    #[default]
    #[serde(alias = "cache")]
    Page,
    /// Fetch response payload.
    Fetch,
    /// Composable payload. Not supported by the storage tier.
    Composable,
}

impl CacheKind {
    /// Resolve the storage layout for this kind.
    ///
    /// Fails with [`CacheError::UnsupportedKind`] for `Composable`.
    pub fn storage_kind(self) -> CacheResult<StorageKind> {
        match self {
            Self::Page => Ok(StorageKind::Page),
            Self::Fetch => Ok(StorageKind::Fetch),
            Self::Composable => Err(CacheError::UnsupportedKind { kind: self }),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Fetch => write!(f, "fetch"),
            Self::Composable => write!(f, "composable"),
        }
    }
}

/// Kinds the storage tier can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Page,
    Fetch,
}

/// Inputs of [`compute_cache_key`] besides the raw key.
#[derive(Debug, Clone, Copy)]
pub struct KeyOptions<'a> {
    /// Entry layout.
    pub kind: StorageKind,
    /// Build the entry belongs to.
    pub build_id: &'a BuildId,
    /// Key prefix, usually [`CacheConfig::cache_dir`].
    pub prefix: &'a str,
}

impl<'a> KeyOptions<'a> {
    /// Options for `kind` using the prefix and build id of `config`.
    pub fn from_config(kind: StorageKind, config: &'a CacheConfig, prefix: &'a str) -> Self {
        Self {
            kind,
            build_id: &config.build_id,
            prefix,
        }
    }
}

/// Compute the object store key of a cache entry.
pub fn compute_cache_key(raw_key: &str, options: &KeyOptions<'_>) -> String {
    let build_id = options.build_id.as_str();
    match options.kind {
        StorageKind::Fetch => join_segments(&[options.prefix, FETCH_NAMESPACE, build_id, raw_key]),
        StorageKind::Page => {
            let key = join_segments(&[options.prefix, build_id, raw_key]);
            format!("{key}{CACHE_SUFFIX}")
        }
    }
}

/// Edge cache key of a cache entry.
///
/// Page keys are used as-is; fetch keys move under [`FETCH_NAMESPACE`] so
/// the two kinds never share an edge cache entry.
pub fn hot_cache_key(raw_key: &str, kind: StorageKind) -> String {
    match kind {
        StorageKind::Page => raw_key.to_string(),
        StorageKind::Fetch => format!("{FETCH_NAMESPACE}/{}", raw_key.trim_start_matches('/')),
    }
}

/// Object store key of the tag manifest under `prefix`.
pub fn tag_manifest_key(prefix: &str) -> String {
    join_segments(&[prefix, TAG_MANIFEST_FILE])
}

fn join_segments(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
