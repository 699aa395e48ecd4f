//! Remote resource access
//!
//! Provides a trait for the two network operations the fetcher needs, so it
//! can be driven by a real HTTP client or by an in-process fake:
//! - a short metadata probe (freshness and naming hints)
//! - a streaming download into a local file

use crate::error::{AppfetchError, AppfetchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Timeout for the metadata probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Downloads slower than this get a throughput report
const THROUGHPUT_REPORT_AFTER: Duration = Duration::from_secs(2);

/// Response headers relevant to caching and naming
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// `Last-Modified`, used as the freshness token
    pub last_modified: Option<DateTime<Utc>>,
    /// `Content-Type`
    pub content_type: Option<String>,
    /// `Content-Disposition`
    pub content_disposition: Option<String>,
}

impl RemoteMetadata {
    /// Parse an HTTP date such as `Wed, 21 Oct 2015 07:28:00 GMT`
    pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Network access used by the fetcher
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch response metadata without the body
    async fn probe(&self, url: &str) -> AppfetchResult<RemoteMetadata>;

    /// Stream the resource at `url` into `dest`, returning `dest`
    async fn download(&self, url: &str, dest: &Path) -> AppfetchResult<PathBuf>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given `User-Agent`
    pub fn new(user_agent: &str) -> AppfetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppfetchError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, url: &str) -> AppfetchResult<RemoteMetadata> {
        let response = self
            .client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppfetchError::download(url, e))?;

        let headers = response.headers();
        Ok(RemoteMetadata {
            last_modified: header_text(headers, LAST_MODIFIED)
                .as_deref()
                .and_then(RemoteMetadata::parse_http_date),
            content_type: header_text(headers, CONTENT_TYPE),
            content_disposition: header_text(headers, CONTENT_DISPOSITION),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> AppfetchResult<PathBuf> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppfetchError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let started = Instant::now();
        let result = stream_to_file(&self.client, url, dest).await;
        let size = match result {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(e);
            }
        };

        report_transfer(url, dest, size, started.elapsed());
        Ok(dest.to_path_buf())
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn stream_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> AppfetchResult<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppfetchError::download(url, e))?;

    let status = response.status();
    if is_failure_status(status) {
        return Err(AppfetchError::download(url, format!("HTTP status {}", status)));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| AppfetchError::io(format!("creating {}", dest.display()), e))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppfetchError::download(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| AppfetchError::io(format!("writing {}", dest.display()), e))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| AppfetchError::io(format!("flushing {}", dest.display()), e))?;

    Ok(written)
}

/// Any status of 400 and above, including non-standard codes past 599
fn is_failure_status(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// Log how long a transfer took, plus its speed when it was slow
pub(crate) fn report_transfer(url: &str, dest: &Path, size: u64, elapsed: Duration) {
    info!(
        "Downloaded {} to '{}' ({}) in {:.3}s",
        url,
        dest.display(),
        format_bytes(size),
        elapsed.as_secs_f64()
    );
    if elapsed >= THROUGHPUT_REPORT_AFTER {
        let per_second = (size as f64 / elapsed.as_secs_f64()) as u64;
        info!("Approximate download speed: {}/s", format_bytes(per_second));
    } else {
        debug!("Download finished under {:?}", THROUGHPUT_REPORT_AFTER);
    }
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
