//! appfetch - application bundle acquisition
//!
//! Resolves a local path or http(s) URL to a ready-to-use application
//! bundle, downloading and unpacking zip archives as needed and caching
//! the results across calls.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod extensions;
pub mod fetcher;
pub mod helpers;
pub mod naming;
pub mod transport;

pub use cache::{CacheEntry, CacheStore};
pub use error::{AppfetchError, AppfetchResult};
pub use extensions::SupportedExtensions;
pub use fetcher::AppFetcher;
pub use transport::{HttpTransport, RemoteMetadata, Transport};
