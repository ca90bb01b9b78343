//! Keyed mutual exclusion.
//!
//! Serializes read-modify-write cycles on a shared document within one
//! process. Entries are created on first use and removed when the last holder
//! or waiter for a key is gone. There is no cross-process guarantee.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// A set of async mutexes addressed by string key.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct KeyedMutex {
    locks: Arc<Mutex<LockMap>>,
}

/// Holds the lock for one key until dropped.
#[derive(Debug)]
pub struct KeyedGuard {
    key: String,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedMutex {
    /// Create an empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Waiters are granted the lock in arrival order.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        if mutex.try_lock().is_err() {
            tracing::debug!(key, "waiting for lock");
        }
        let guard = mutex.lock_owned().await;
        tracing::debug!(key, "acquired lock");

        KeyedGuard {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// The lock is released when `f` completes, fails, or is cancelled.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock(key).await;
        f().await
    }

    /// Whether anyone currently holds or awaits `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.contains_key(key)
    }

    /// Number of keys with a holder or waiter.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no key is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyedGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one inside our guard: nobody else waits.
        if let Some(mutex) = locks.get(&self.key) {
            if Arc::strong_count(mutex) <= 2 {
                locks.remove(&self.key);
            }
        }
        self.guard.take();
        tracing::debug!(key = %self.key, "released lock");
    }
}
