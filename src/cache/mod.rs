//! Application cache
//!
//! Remembers which local artifact each descriptor resolved to, so repeated
//! acquisitions of unchanged content skip the download and the extraction.
//!
//! # Entry Lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | First successful acquisition | Entry created |
//! | Newer `Last-Modified` or archive digest | Entry replaced, old artifact deleted |
//! | Capacity exceeded | LRU entry evicted, artifact deleted |
//! | Idle for 24h | Entry expired, artifact deleted |
//! | Artifact missing on access | Entry purged |
//! | Host teardown | All artifacts swept synchronously |

pub mod lock;
pub mod store;

pub use lock::KeyedLock;
pub use store::{CacheEntry, CacheStore, DEFAULT_CAPACITY, DEFAULT_MAX_AGE};
