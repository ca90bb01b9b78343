//! Adapter configuration.

use serde::{Deserialize, Serialize};

use crate::build::BuildId;

/// Directory under the bucket prefix holding every cache object.
pub const CACHE_DIR: &str = "data-cache/_next_cache";

/// File name of the tag manifest inside [`CACHE_DIR`].
pub const TAG_MANIFEST_FILE: &str = "cache-tags-manifest.cache";

/// Default name of the edge cache storage.
pub const DEFAULT_CACHE_API_STORAGE_NAME: &str = "nextjs-cache";

/// Environment variable names read by [`CacheConfig::from_env`].
pub mod env {
    pub const BUCKET_PREFIX: &str = "AZION_BUCKET_PREFIX";
    pub const CACHE_API_STORAGE_NAME: &str = "AZION_CACHE_API_STORAGE_NAME";
    pub const BUILD_ID: &str = "NEXT_BUILD_ID";
    pub const BUILD_TIMESTAMP_MS: &str = "BUILD_TIMESTAMP_MS";
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Configuration consumed by the incremental cache and tag cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix of every object key in the durable bucket.
    #[serde(default)]
    pub bucket_prefix: String,

    /// Name of the edge cache storage (combined with the build id).
    #[serde(default = "default_cache_api_storage_name")]
    pub cache_api_storage_name: String,

    /// Build identifier.
    #[serde(default)]
    pub build_id: BuildId,

    /// Build timestamp injected at build time (epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_timestamp_ms: Option<i64>,
}

fn default_cache_api_storage_name() -> String {
    DEFAULT_CACHE_API_STORAGE_NAME.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket_prefix: String::new(),
            cache_api_storage_name: default_cache_api_storage_name(),
            build_id: BuildId::default(),
            build_timestamp_ms: None,
        }
    }
}

impl CacheConfig {
    /// Create a config for the given build id, everything else defaulted.
    pub fn new(build_id: impl Into<BuildId>) -> Self {
        Self {
            build_id: build_id.into(),
            ..Self::default()
        }
    }

    /// Set the bucket prefix.
    pub fn with_bucket_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bucket_prefix = prefix.into();
        self
    }

    /// Set the edge cache storage name.
    pub fn with_cache_api_storage_name(mut self, name: impl Into<String>) -> Self {
        self.cache_api_storage_name = name.into();
        self
    }

    /// Set the build timestamp.
    pub fn with_build_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.build_timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let build_timestamp_ms = match lookup(env::BUILD_TIMESTAMP_MS) {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                ConfigError::InvalidValue {
                    name: env::BUILD_TIMESTAMP_MS,
                    value: raw,
                }
            })?),
            None => None,
        };

        Ok(Self {
            bucket_prefix: lookup(env::BUCKET_PREFIX).unwrap_or_default(),
            cache_api_storage_name: lookup(env::CACHE_API_STORAGE_NAME)
                .unwrap_or_else(default_cache_api_storage_name),
            build_id: BuildId::from_option(lookup(env::BUILD_ID)),
            build_timestamp_ms,
        })
    }

    /// Name of the edge cache storage for this build: `<buildId>_<storageName>`.
    pub fn edge_cache_name(&self) -> String {
        format!("{}_{}", self.build_id, self.cache_api_storage_name)
    }

    /// Key prefix of all cache objects: `<bucketPrefix>/data-cache/_next_cache`.
    pub fn cache_dir(&self) -> String {
        if self.bucket_prefix.is_empty() {
            CACHE_DIR.to_string()
        } else {
            format!("{}/{}", self.bucket_prefix.trim_end_matches('/'), CACHE_DIR)
        }
    }

    /// `lastModified` reported for payloads stored without one.
    pub fn default_last_modified(&self) -> i64 {
        self.build_timestamp_ms.unwrap_or(0)
    }
}
