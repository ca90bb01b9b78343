//! Directory-backed object store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::store::{ObjectMetadata, ObjectStore};

/// Object store mapping keys to files under a root directory.
///
/// Used to lay out a bucket locally before upload and for local preview.
/// Object metadata is not persisted.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a file path, rejecting keys that escape the root.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _metadata: ObjectMetadata) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::trace!(key, path = %path.display(), "wrote object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_roundtrip_with_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let key = "data-cache/_next_cache/b1/blog/post.cache";
        assert!(store.get(key).await.unwrap().is_none());

        store
            .put(key, b"{}".to_vec(), ObjectMetadata::with_id("b1"))
            .await
            .unwrap();
        assert!(dir.path().join(key).exists());
        assert_eq!(store.get(key).await.unwrap(), Some(b"{}".to_vec()));

        store.delete(key).await.unwrap();
        store.delete(key).await.unwrap();
        assert!(store.get(key).await.unwrap().is_none());
    }

    #[test]
    fn test_path_for_strips_leading_slash() {
        let store = FsObjectStore::new("/srv/bucket");
        assert_eq!(
            store.path_for("/a/b.cache").unwrap(),
            PathBuf::from("/srv/bucket/a/b.cache")
        );
    }

    #[test]
    fn test_path_for_rejects_escape() {
        let store = FsObjectStore::new("/srv/bucket");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("a/../../b").is_err());
        assert!(store.path_for("").is_err());
    }
}
