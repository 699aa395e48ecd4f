//! End-to-end acquisition over HTTP against a local axum server

use crate::common::zip_bytes;
use appfetch::error::AppfetchError;
use appfetch::transport::{HttpTransport, Transport};
use appfetch::{AppFetcher, SupportedExtensions};
use axum::{
    body::Body,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, LAST_MODIFIED},
        Method, Response, StatusCode,
    },
    routing::get,
    serve, Router,
};
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

const STAMP: &str = "Wed, 01 May 2024 10:00:00 GMT";

struct TestHttpServer {
    base: String,
    gets: Arc<AtomicUsize>,
}

impl TestHttpServer {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gets = Arc::new(AtomicUsize::new(0));

        let apk_gets = gets.clone();
        let zip_gets = gets.clone();
        let archive = zip_bytes(&[("build/app-release.apk", "release"), ("app-debug.apk", "debug")]);

        let router = Router::new()
            .route(
                "/app.apk",
                get(move |method: Method| {
                    let gets = apk_gets.clone();
                    async move {
                        if method == Method::GET {
                            gets.fetch_add(1, Ordering::SeqCst);
                        }
                        Response::builder()
                            .status(StatusCode::OK)
                            .header(LAST_MODIFIED, STAMP)
                            .header(CONTENT_TYPE, "application/vnd.android.package-archive")
                            .body(Body::from("apk-bytes"))
                            .unwrap()
                    }
                }),
            )
            .route(
                "/artifact",
                get(move |method: Method| {
                    let gets = zip_gets.clone();
                    let archive = archive.clone();
                    async move {
                        if method == Method::GET {
                            gets.fetch_add(1, Ordering::SeqCst);
                        }
                        Response::builder()
                            .status(StatusCode::OK)
                            .header(LAST_MODIFIED, STAMP)
                            .header(CONTENT_TYPE, "application/octet-stream")
                            .header(CONTENT_DISPOSITION, "attachment; filename=\"build.zip\"")
                            .body(Body::from(archive))
                            .unwrap()
                    }
                }),
            );

        tokio::spawn(async move {
            let _ = serve(listener, router).await;
        });

        Self {
            base: format!("http://{addr}"),
            gets,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

fn http_fetcher(work: &TempDir) -> AppFetcher {
    let transport = HttpTransport::new("appfetch-tests").unwrap();
    AppFetcher::with_transport(Arc::new(transport), work.path())
}

#[tokio::test]
async fn probe_reads_caching_headers() {
    let server = TestHttpServer::spawn().await;
    let transport = HttpTransport::new("appfetch-tests").unwrap();

    let meta = transport.probe(&server.url("/artifact")).await.unwrap();

    assert_eq!(
        meta.last_modified,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(meta.content_type.as_deref(), Some("application/octet-stream"));
    assert!(meta.content_disposition.unwrap().contains("build.zip"));
    assert_eq!(server.gets(), 0);
}

#[tokio::test]
async fn remote_bundle_is_cached_by_last_modified() {
    let server = TestHttpServer::spawn().await;
    let work = TempDir::new().unwrap();
    let fetcher = http_fetcher(&work);
    let apk = SupportedExtensions::try_from(".apk").unwrap();
    let url = server.url("/app.apk");

    let first = fetcher.acquire(&url, &apk).await.unwrap();
    let second = fetcher.acquire(&url, &apk).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.file_name().unwrap(), "app.apk");
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "apk-bytes");
    assert_eq!(server.gets(), 1);
}

#[tokio::test]
async fn remote_archive_yields_shallowest_bundle() {
    let server = TestHttpServer::spawn().await;
    let work = TempDir::new().unwrap();
    let fetcher = http_fetcher(&work);
    let apk = SupportedExtensions::try_from(".apk").unwrap();

    let bundle = fetcher.acquire(&server.url("/artifact"), &apk).await.unwrap();

    assert_eq!(bundle.file_name().unwrap(), "app-debug.apk");
    assert_eq!(std::fs::read_to_string(&bundle).unwrap(), "debug");
}

#[tokio::test]
async fn http_404_is_a_download_failure() {
    let server = TestHttpServer::spawn().await;
    let work = TempDir::new().unwrap();
    let fetcher = http_fetcher(&work);
    let apk = SupportedExtensions::try_from(".apk").unwrap();

    let err = fetcher
        .acquire(&server.url("/missing.apk"), &apk)
        .await
        .unwrap_err();

    match err {
        AppfetchError::DownloadFailure { cause, .. } => assert!(cause.contains("404")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(fetcher.cache().is_empty());
}
