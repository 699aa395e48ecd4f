//! In-memory application cache
//!
//! Maps a descriptor to the artifact it last resolved to. The store is
//! bounded by entry count (least-recently-used eviction) and by idle age
//! (sliding TTL). Entries leaving the store take their artifact on disk
//! with them.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of cached applications
pub const DEFAULT_CAPACITY: usize = 100;

/// Idle age after which an entry is dropped
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Metadata about a resolved artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hex sha256 of the raw archive the artifact was extracted from
    pub content_hash: Option<String>,
    /// Remote `Last-Modified` value observed when the artifact was fetched
    pub last_modified: Option<DateTime<Utc>>,
    /// Absolute path of the ready-to-use bundle
    pub resolved_path: PathBuf,
}

impl CacheEntry {
    pub fn new(resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            content_hash: None,
            last_modified: None,
            resolved_path: resolved_path.into(),
        }
    }

    pub fn with_content_hash(mut self, hash: Option<String>) -> Self {
        self.content_hash = hash;
        self
    }

    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }
}

struct Slot {
    entry: CacheEntry,
    touched: Instant,
}

/// Bounded, age-expiring descriptor → artifact map
pub struct CacheStore {
    entries: Mutex<LruCache<String, Slot>>,
    max_age: Duration,
    swept: AtomicBool,
}

impl CacheStore {
    /// Create a store holding at most `capacity` entries for 24 hours each
    pub fn new(capacity: usize) -> Self {
        Self::with_max_age(capacity, DEFAULT_MAX_AGE)
    }

    /// Create a store with a custom idle age ceiling
    pub fn with_max_age(capacity: usize, max_age: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_age,
            swept: AtomicBool::new(false),
        }
    }

    /// Look up an entry, refreshing its recency and age.
    ///
    /// Expired entries are dropped (and their artifact deleted) instead of
    /// being returned.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let expired = {
            let mut entries = self.lock();
            let now = Instant::now();
            let slot = entries.get_mut(key)?;
            if now.duration_since(slot.touched) <= self.max_age {
                slot.touched = now;
                return Some(slot.entry.clone());
            }
            entries.pop(key)
        };

        if let Some(slot) = expired {
            debug!("Cache entry for '{}' expired", key);
            dispose(&slot.entry.resolved_path).await;
        }
        None
    }

    /// Whether a live entry exists for `key` (does not refresh its age)
    pub fn contains(&self, key: &str) -> bool {
        let entries = self.lock();
        entries
            .peek(key)
            .is_some_and(|slot| slot.touched.elapsed() <= self.max_age)
    }

    /// Insert or replace the entry for `key`.
    ///
    /// A replaced entry whose artifact differs from the new one has its
    /// artifact deleted. Entries pushed out by capacity or age are disposed.
    pub async fn set(&self, key: &str, entry: CacheEntry) {
        let mut doomed: Vec<PathBuf> = Vec::new();
        {
            let mut entries = self.lock();
            doomed.extend(self.take_expired(&mut entries));

            let new_path = entry.resolved_path.clone();
            let slot = Slot {
                entry,
                touched: Instant::now(),
            };
            if let Some((old_key, old)) = entries.push(key.to_string(), slot) {
                if old_key != key {
                    debug!("Evicting least recently used entry '{}'", old_key);
                    doomed.push(old.entry.resolved_path);
                } else if old.entry.resolved_path != new_path {
                    doomed.push(old.entry.resolved_path);
                }
            }
        }

        for path in doomed {
            dispose(&path).await;
        }
    }

    /// Remove the entry for `key`, deleting its artifact
    pub async fn delete(&self, key: &str) {
        let removed = self.lock().pop(key);
        if let Some(slot) = removed {
            dispose(&slot.entry.resolved_path).await;
        }
    }

    /// Number of entries currently held (including not yet pruned expired ones)
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronously delete every cached artifact.
    ///
    /// Meant for the host's teardown sequence. Runs once per store; later
    /// calls are no-ops. Failures are logged and swallowed.
    pub fn shutdown(&self) {
        if self.swept.swap(true, Ordering::SeqCst) {
            return;
        }

        let paths: Vec<PathBuf> = {
            let mut entries = self.lock();
            let mut paths = Vec::with_capacity(entries.len());
            while let Some((_, slot)) = entries.pop_lru() {
                paths.push(slot.entry.resolved_path);
            }
            paths
        };

        if paths.is_empty() {
            return;
        }

        info!("Performing cleanup of {} cached application(s)", paths.len());
        for path in paths {
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    fn take_expired(&self, entries: &mut LruCache<String, Slot>) -> Vec<PathBuf> {
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, slot)| slot.touched.elapsed() > self.max_age)
            .map(|(key, _)| key.clone())
            .collect();

        stale
            .iter()
            .filter_map(|key| entries.pop(key))
            .map(|slot| slot.entry.resolved_path)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Delete an artifact that left the cache. Missing paths are fine.
async fn dispose(path: &Path) {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(_) => return,
    };

    info!("The application at '{}' is being deleted from the cache", path.display());
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = result {
        warn!("Failed to delete {}: {}", path.display(), e);
    }
}
