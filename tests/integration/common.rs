//! Shared fixtures: an in-process transport, zip builders and an HTTP server

use appfetch::error::{AppfetchError, AppfetchResult};
use appfetch::transport::{RemoteMetadata, Transport};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use zip::write::SimpleFileOptions;

struct Resource {
    body: Vec<u8>,
    meta: RemoteMetadata,
}

/// Transport serving canned resources and counting downloads
#[derive(Default)]
pub struct FakeTransport {
    resources: Mutex<HashMap<String, Resource>>,
    downloads: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url` with the given freshness token
    pub fn serve(&self, url: &str, body: &[u8], last_modified: Option<DateTime<Utc>>) {
        self.serve_with(
            url,
            body,
            RemoteMetadata {
                last_modified,
                ..RemoteMetadata::default()
            },
        );
    }

    pub fn serve_with(&self, url: &str, body: &[u8], meta: RemoteMetadata) {
        self.resources.lock().unwrap().insert(
            url.to_string(),
            Resource {
                body: body.to_vec(),
                meta,
            },
        );
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn probe(&self, url: &str) -> AppfetchResult<RemoteMetadata> {
        self.resources
            .lock()
            .unwrap()
            .get(url)
            .map(|r| r.meta.clone())
            .ok_or_else(|| AppfetchError::download(url, "HTTP status 404 Not Found"))
    }

    async fn download(&self, url: &str, dest: &Path) -> AppfetchResult<PathBuf> {
        let body = self
            .resources
            .lock()
            .unwrap()
            .get(url)
            .map(|r| r.body.clone())
            .ok_or_else(|| AppfetchError::download(url, "HTTP status 404 Not Found"))?;

        // Leave room for concurrent callers to pile up
        tokio::time::sleep(Duration::from_millis(20)).await;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(dest, body).await.unwrap();
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(dest.to_path_buf())
    }
}

/// Zip archive bytes. Entries ending in `/` are directories.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

pub fn timestamp(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

/// Whether `dir` is missing or holds no entries
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut d| d.next().is_none())
        .unwrap_or(true)
}

/// Number of entries directly inside `dir`
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
