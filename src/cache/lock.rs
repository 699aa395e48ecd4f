//! Per-key async exclusion
//!
//! Work sharing a key runs one at a time, in arrival order; work for
//! different keys runs in parallel.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A set of async mutexes created on demand, one per key
#[derive(Default)]
pub struct KeyedLock {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock for `key`
    pub async fn acquire<F, T>(&self, key: &str, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let slot = Arc::clone(self.slots.entry(key.to_owned()).or_default().value());

        let result = {
            let _guard = slot.lock().await;
            work.await
        };

        drop(slot);
        // Drop the slot once nobody holds or waits on it
        self.slots
            .remove_if(key, |_, slot| Arc::strong_count(slot) == 1);

        result
    }

    /// Number of keys with a holder or waiter
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}
