//! Named mutexes serializing read-modify-write cycles on remote objects.
//!
//! List-valued fields such as `keyCredentials` are replaced wholesale by a
//! PATCH, so two handlers appending to the same application concurrently
//! would lose one of the writes. Handlers take a lock named after the
//! resource type and keyed by the parent object id for the duration of the
//! fetch, modify and patch sequence.
//!
//! The returned [`NamedLockGuard`] releases the lock when dropped, which
//! covers early returns through `?` as well as unwinding. Registry entries
//! are dropped as soon as nobody holds or awaits them.

use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of named async mutexes.
#[derive(Debug, Default)]
pub struct NamedLocks {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, key: &str) -> String {
        format!("{name}.{key}")
    }

    /// Acquire the lock `name` for `key`, waiting while another holder has it.
    pub async fn lock(self: &Arc<Self>, name: &str, key: &str) -> NamedLockGuard {
        let lock_key = Self::key(name, key);

        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .entry(lock_key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        trace!("Waiting for lock {lock_key}");
        let guard = mutex.lock_owned().await;
        trace!("Acquired lock {lock_key}");

        NamedLockGuard {
            registry: Arc::clone(self),
            key: lock_key,
            guard: Some(guard),
        }
    }

    /// Whether someone currently holds the lock.
    pub fn is_locked(&self, name: &str, key: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&Self::key(name, key))
            .is_some_and(|m| m.try_lock().is_err())
    }

    /// Number of registry entries currently held or awaited.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // the registry holds one reference; any other is a holder or waiter
        if entries.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
            entries.remove(key);
        }
    }
}

/// Holds a named lock until dropped.
#[derive(Debug)]
pub struct NamedLockGuard {
    registry: Arc<NamedLocks>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl NamedLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        // release the mutex before pruning so the strong count is accurate
        drop(self.guard.take());
        trace!("Released lock {}", self.key);
        self.registry.release(&self.key);
    }
}
