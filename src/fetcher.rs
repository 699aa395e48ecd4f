//! Application acquisition
//!
//! Turns a descriptor (local path or http(s) URL) into the absolute path of
//! a ready-to-use bundle. Per descriptor the flow is:
//!
//! ```text
//! START ─┬─ URL ─── probe ── fresh cache entry? ── yes ─────────────────────┐
//!        │                         └─ no ── download ─┐                     │
//!        ├─ LOCAL ─ exists? ── yes ───────────────────┤                     │
//!        │              └─ no ── NotFound             ▼                     │
//!        └─ other ── UnsupportedProtocol       zip? ── extract ──┐          │
//!                                                └── absolutize ─┤          │
//!                                                                ▼          ▼
//!                                                validate ── update cache ── DONE
//! ```
//!
//! The whole sequence runs under a per-descriptor lock, so concurrent
//! callers for one descriptor perform a single download and extraction and
//! later callers observe the cache state the first one left behind.

use crate::archive;
use crate::cache::{CacheEntry, CacheStore, KeyedLock, DEFAULT_CAPACITY};
use crate::config::{Config, ConfigManager};
use crate::error::{AppfetchError, AppfetchResult};
use crate::extensions::SupportedExtensions;
use crate::naming::{derive_download_name, is_zip_path};
use crate::transport::{HttpTransport, RemoteMetadata, Transport, PROBE_TIMEOUT};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Downloads land in `<work_dir>/downloads/<uuid>/<name>`
const DOWNLOADS_DIR: &str = "downloads";
/// Extracted bundles land in `<work_dir>/apps/<uuid>/<bundle>`
const APPS_DIR: &str = "apps";
/// Short-lived extraction workspaces
const SCRATCH_DIR: &str = "scratch";

/// Where a descriptor points
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Remote(Url),
    Local(PathBuf),
}

/// A candidate artifact before validation
struct Staged {
    path: PathBuf,
    is_archive: bool,
    /// Download directory owned by this acquisition
    staging: Option<PathBuf>,
}

impl Staged {
    /// Delete the download directory, if this acquisition created one
    async fn discard(&self) {
        if let Some(dir) = &self.staging {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                warn!("Failed to remove download directory {}: {}", dir.display(), e);
            }
        }
    }
}

/// Resolves application descriptors to local bundles, caching results
pub struct AppFetcher {
    cache: Arc<CacheStore>,
    locks: KeyedLock,
    transport: Arc<dyn Transport>,
    work_dir: PathBuf,
}

impl AppFetcher {
    /// Create a fetcher from configuration, using the HTTP transport
    pub fn new(config: &Config) -> AppfetchResult<Self> {
        let transport = HttpTransport::new(&config.network.user_agent)?;
        let work_dir = config
            .cache
            .work_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_work_dir);

        Ok(Self::with_transport(Arc::new(transport), work_dir)
            .with_cache(CacheStore::new(config.cache.max_entries)))
    }

    /// Create a fetcher with a custom transport and working directory
    pub fn with_transport(transport: Arc<dyn Transport>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        let work_dir = std::path::absolute(&work_dir).unwrap_or(work_dir);
        Self {
            cache: Arc::new(CacheStore::new(DEFAULT_CAPACITY)),
            locks: KeyedLock::new(),
            transport,
            work_dir,
        }
    }

    /// Replace the cache store
    #[must_use]
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// The cache backing this fetcher
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Root directory for downloads, bundles and scratch space
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Synchronously delete every cached artifact. Call once during teardown.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }

    /// Resolve `descriptor` to the absolute path of a supported bundle
    pub async fn acquire(
        &self,
        descriptor: &str,
        extensions: &SupportedExtensions,
    ) -> AppfetchResult<PathBuf> {
        self.locks
            .acquire(descriptor, self.resolve(descriptor, extensions))
            .await
    }

    async fn resolve(
        &self,
        descriptor: &str,
        extensions: &SupportedExtensions,
    ) -> AppfetchResult<PathBuf> {
        let mut key = descriptor.to_string();
        let mut last_modified: Option<DateTime<Utc>> = None;

        let staged = match classify(descriptor).await? {
            Source::Remote(url) => {
                info!("Using downloadable app '{}'", descriptor);
                let meta = self.probe(&url).await;
                last_modified = meta.last_modified;

                if let Some(path) = self.fresh_cached_path(&key, &meta).await {
                    return extensions.verify(&path).map(Path::to_path_buf);
                }
                self.download(&url, &meta, extensions).await?
            }
            Source::Local(path) => {
                info!("Using local app '{}'", path.display());
                Staged {
                    is_archive: is_zip_path(&path),
                    path,
                    staging: None,
                }
            }
        };

        let mut content_hash: Option<String> = None;
        let resolved = if staged.is_archive {
            let hash = match hash_file(&staged.path).await {
                Ok(hash) => hash,
                Err(e) => {
                    staged.discard().await;
                    return Err(e);
                }
            };

            if let Some(path) = self.reusable_extraction(&key, &hash, last_modified).await {
                staged.discard().await;
                return extensions.verify(&path).map(Path::to_path_buf);
            }

            let dest_root = self.work_dir.join(APPS_DIR).join(Uuid::new_v4().to_string());
            let extracted = archive::extract_bundle(
                &staged.path,
                &dest_root,
                &self.work_dir.join(SCRATCH_DIR),
                extensions,
            )
            .await;
            staged.discard().await;

            let bundle = extracted?;
            info!("Unzipped app to '{}'", bundle.display());
            content_hash = Some(hash);
            bundle
        } else if !staged.path.is_absolute() {
            let absolute = std::path::absolute(&staged.path)
                .map_err(|e| AppfetchError::io("resolving against current directory", e))?;
            warn!(
                "The current application path '{}' is not absolute and has been rewritten to '{}'. \
                 Consider using absolute paths rather than relative",
                descriptor,
                absolute.display()
            );
            key = absolute.to_string_lossy().into_owned();
            absolute
        } else {
            staged.path.clone()
        };

        if let Err(e) = extensions.verify(&resolved) {
            staged.discard().await;
            return Err(e);
        }

        let derived = resolved != Path::new(&key);
        if derived && (content_hash.is_some() || last_modified.is_some()) {
            let entry = CacheEntry::new(&resolved)
                .with_content_hash(content_hash)
                .with_last_modified(last_modified);
            self.cache.set(&key, entry).await;
        }

        Ok(resolved)
    }

    /// Probe remote metadata. Failures and timeouts yield empty metadata.
    async fn probe(&self, url: &Url) -> RemoteMetadata {
        match tokio::time::timeout(PROBE_TIMEOUT, self.transport.probe(url.as_str())).await {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => {
                debug!("Cannot retrieve headers of {}: {}", url, e);
                RemoteMetadata::default()
            }
            Err(_) => {
                debug!("Retrieving headers of {} timed out after {:?}", url, PROBE_TIMEOUT);
                RemoteMetadata::default()
            }
        }
    }

    /// Cached path for `key` if the remote has not changed since it was fetched
    async fn fresh_cached_path(&self, key: &str, meta: &RemoteMetadata) -> Option<PathBuf> {
        let remote = meta.last_modified?;
        let entry = self.cache.get(key).await?;
        let cached = entry.last_modified?;
        if cached < remote {
            debug!("Remote copy of '{}' changed since {}", key, cached);
            return None;
        }

        if path_exists(&entry.resolved_path).await {
            info!(
                "Reusing previously downloaded application at '{}'",
                entry.resolved_path.display()
            );
            return Some(entry.resolved_path);
        }

        info!(
            "The application at '{}' does not exist anymore. Deleting it from the cache",
            entry.resolved_path.display()
        );
        self.cache.delete(key).await;
        None
    }

    /// Previously extracted bundle for an archive with digest `hash`
    async fn reusable_extraction(
        &self,
        key: &str,
        hash: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> Option<PathBuf> {
        let entry = self.cache.get(key).await?;
        if entry.content_hash.as_deref() != Some(hash) {
            return None;
        }

        if !path_exists(&entry.resolved_path).await {
            info!(
                "The application at '{}' does not exist anymore. Deleting it from the cache",
                entry.resolved_path.display()
            );
            self.cache.delete(key).await;
            return None;
        }

        info!(
            "Will reuse previously cached application at '{}'",
            entry.resolved_path.display()
        );
        let path = entry.resolved_path.clone();
        if last_modified.is_some() && last_modified != entry.last_modified {
            // Same bytes under a newer token: remember the token
            let refreshed = entry.with_last_modified(last_modified);
            self.cache.set(key, refreshed).await;
        }
        Some(path)
    }

    /// Download into a fresh staging directory
    async fn download(
        &self,
        url: &Url,
        meta: &RemoteMetadata,
        extensions: &SupportedExtensions,
    ) -> AppfetchResult<Staged> {
        let name = derive_download_name(url, meta, extensions);
        let staging = self
            .work_dir
            .join(DOWNLOADS_DIR)
            .join(Uuid::new_v4().to_string());
        let dest = staging.join(&name.file_name);
        debug!("Downloading {} to {}", url, dest.display());

        match self.transport.download(url.as_str(), &dest).await {
            Ok(path) => Ok(Staged {
                path,
                is_archive: name.is_archive,
                staging: Some(staging),
            }),
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&staging).await;
                Err(e)
            }
        }
    }
}

/// Decide whether a descriptor is a URL or a local path
async fn classify(descriptor: &str) -> AppfetchResult<Source> {
    let parsed = Url::parse(descriptor).ok();
    if let Some(url) = &parsed {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(Source::Remote(url.clone()));
        }
    }

    let path = PathBuf::from(descriptor);
    if path_exists(&path).await {
        return Ok(Source::Local(path));
    }

    match parsed {
        // `C:\app.apk` parses with scheme `c`; that is a path, not a protocol
        Some(url) if url.scheme().len() > 1 => Err(AppfetchError::UnsupportedProtocol {
            protocol: format!("{}:", url.scheme()),
            descriptor: descriptor.to_string(),
        }),
        _ => Err(AppfetchError::NotFound(descriptor.to_string())),
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Hex sha256 of a file's content
pub async fn hash_file(path: &Path) -> AppfetchResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppfetchError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| AppfetchError::io(format!("reading {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
