//! Spin Key-Value backed object store.

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::store::{ObjectMetadata, ObjectStore};

/// Object store backed by a Spin Key-Value store.
///
/// Spin's store has no object metadata, so it is dropped on write.
pub struct SpinObjectStore {
    store: spin_sdk::key_value::Store,
}

impl SpinObjectStore {
    /// Open the default Key-Value store.
    pub fn open_default() -> StoreResult<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { store })
    }

    /// Open a named Key-Value store.
    pub fn open(name: &str) -> StoreResult<Self> {
        let store = spin_sdk::key_value::Store::open(name)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { store })
    }
}

#[async_trait]
impl ObjectStore for SpinObjectStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.store
            .get(key)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _metadata: ObjectMetadata) -> StoreResult<()> {
        self.store
            .set(key, &bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.store
            .delete(key)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
