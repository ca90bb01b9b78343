//! Durable object store capability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Metadata attached to a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectMetadata(BTreeMap<String, String>);

impl ObjectMetadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying the build id that wrote the object.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self::new().insert("id", id)
    }

    /// Add an entry.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Durable key-value object storage.
///
/// Keys are slash-delimited strings. A missing object is `Ok(None)`, never an
/// error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write an object, replacing any previous value.
    async fn put(&self, key: &str, bytes: Vec<u8>, metadata: ObjectMetadata) -> StoreResult<()>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_with_id() {
        let meta = ObjectMetadata::with_id("b1");
        assert_eq!(meta.get("id"), Some("b1"));
        assert!(!meta.is_empty());
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"id":"b1"}"#);
    }
}
