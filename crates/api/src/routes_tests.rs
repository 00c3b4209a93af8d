//! End-to-end tests for the file routes, driven through the full router.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use http_body_util::BodyExt;
use imagestore_core::storage::{
    LocalStorage, MemoryStorage, ObjectReader, StorageBackend, StorageError, StoredObjectPath,
};
use imagestore_core::upload::UploadLimit;
use serde_json::{Value, json};
use tokio::io::AsyncRead;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

use crate::{AppState, create_router};

const LIMIT: u64 = 1024;
const BOUNDARY: &str = "imagestore-test-boundary";

/// Memory backend that counts how often `save` is called.
struct CountingBackend {
    inner: MemoryStorage,
    saves: AtomicUsize,
}

impl CountingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStorage::new().expect("memory storage"),
            saves: AtomicUsize::new(0),
        })
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    async fn save(
        &self,
        path: &StoredObjectPath,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(path, data).await
    }

    async fn get(&self, path: &StoredObjectPath) -> Result<ObjectReader, StorageError> {
        self.inner.get(path).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Backend whose operations never complete.
struct StalledBackend;

#[async_trait]
impl StorageBackend for StalledBackend {
    async fn save(
        &self,
        _path: &StoredObjectPath,
        _data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StorageError> {
        std::future::pending().await
    }

    async fn get(&self, _path: &StoredObjectPath) -> Result<ObjectReader, StorageError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

fn app(storage: Arc<dyn StorageBackend>) -> Router {
    create_router(AppState::new(storage, UploadLimit::new(LIMIT)))
}

fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

fn download(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn multipart(body: Vec<u8>) -> Request<Body> {
    Request::post("/")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

/// Encodes `(field name, filename, content)` parts as a multipart body.
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(filename) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("infallible")
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Size guard
// ============================================================================

#[tokio::test]
async fn test_oversized_declared_length_never_reaches_backend() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let response = send(&app, upload("/1/abc.png", image_bytes(LIMIT as usize + 1))).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"], "payload_too_large");
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_missing_content_length_is_rejected() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let request = Request::post("/1/abc.png")
        .body(Body::from(image_bytes(10)))
        .expect("request");
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_zero_content_length_is_rejected() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let response = send(&app, upload("/1/abc.png", Vec::new())).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_oversized_multipart_never_reaches_backend() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let content = image_bytes(LIMIT as usize);
    let body = multipart_body(&[("1", Some("abc.png"), &content)]);
    let response = send(&app, multipart(body)).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_body_longer_than_declared_is_cut_off() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));

    let request = Request::post("/1/abc.png")
        .header(CONTENT_LENGTH, 8)
        .body(Body::from(image_bytes(LIMIT as usize * 2)))
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = send(&app, download("/1/abc.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Single-file upload and download
// ============================================================================

#[tokio::test]
async fn test_upload_then_download_plain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(Arc::new(LocalStorage::new(dir.path()).expect("local storage")));
    let content = image_bytes(512);

    let response = send(&app, upload("/1/abc.png", content.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        std::fs::read(dir.path().join("1").join("abc.png")).expect("stored file"),
        content
    );

    let response = send(&app, download("/1/abc.png")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, content);
}

#[tokio::test]
async fn test_download_gzip_when_accepted() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));
    let content = image_bytes(LIMIT as usize);

    let response = send(&app, upload("/7/cat.gif", content.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::get("/7/cat.gif")
        .header(ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");

    let client = ServiceBuilder::new()
        .layer(DecompressionLayer::new())
        .service(app.clone());
    let request = Request::get("/7/cat.gif")
        .header(ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .expect("request");
    let response = client.oneshot(request).await.expect("infallible");
    let decoded = response
        .into_body()
        .collect()
        .await
        .expect("decoded body")
        .to_bytes();
    assert_eq!(decoded.as_ref(), content.as_slice());
}

#[tokio::test]
async fn test_download_missing_is_not_found() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));

    let response = send(&app, download("/999/missing.png")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_upload_invalid_path_is_rejected() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    for uri in ["/abc/cat.png", "/1/cat.PNG", "/1/cat1.png", "/1/cat.jpeg"] {
        let response = send(&app, upload(uri, image_bytes(16))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["error"], "invalid_path");
    }
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_invalid_upload_leaves_store_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("filestore");
    let app = app(Arc::new(LocalStorage::new(&root).expect("local storage")));

    for uri in ["/abc/cat.png", "/1/cat.PNG", "/0/cat.png", "/1/..png", "/1/%2E%2E.png"] {
        let response = send(&app, upload(uri, image_bytes(16))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    let body = multipart_body(&[("1/../x.png", None, b"escape"), ("..", Some("x.png"), b"up")]);
    let response = send(&app, multipart(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let results = body_json(response).await;
    assert_eq!(results[0]["error"]["error"], "invalid_path");
    assert_eq!(results[1]["error"]["error"], "invalid_path");

    assert_eq!(std::fs::read_dir(&root).expect("root").count(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).expect("tempdir").count(), 1);
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let state = AppState::new(Arc::new(StalledBackend), UploadLimit::new(LIMIT))
        .with_request_timeout(Duration::from_millis(50));
    let app = create_router(state);

    let response = send(&app, download("/1/abc.png")).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let response = send(&app, upload("/1/abc.png", image_bytes(16))).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_download_invalid_path_is_rejected() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));

    let response = send(&app, download("/1/..png")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_uploads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(Arc::new(LocalStorage::new(dir.path()).expect("local storage")));

    let uploads = (1..=16u8).map(|id| {
        let app = app.clone();
        tokio::spawn(async move {
            let content = vec![id; 256];
            send(&app, upload(&format!("/{id}/img.png"), content)).await.status()
        })
    });
    for status in futures::future::join_all(uploads).await {
        assert_eq!(status.expect("task"), StatusCode::OK);
    }

    for id in 1..=16u8 {
        let response = send(&app, download(&format!("/{id}/img.png"))).await;
        assert_eq!(body_bytes(response).await, vec![id; 256]);
    }
}

// ============================================================================
// Multipart upload
// ============================================================================

#[tokio::test]
async fn test_multipart_isolates_failing_part() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let body = multipart_body(&[
        ("1", Some("first.png"), b"one"),
        ("x", Some("second.png"), b"two"),
        ("2/third.jpg", None, b"three"),
    ]);
    let response = send(&app, multipart(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let results = body_json(response).await;
    assert_eq!(results[0], json!({ "path": "1/first.png" }));
    assert_eq!(results[1]["path"], "x/second.png");
    assert_eq!(results[1]["error"]["error"], "invalid_path");
    assert_eq!(results[2], json!({ "path": "2/third.jpg" }));
    assert_eq!(backend.saves(), 2);

    let response = send(&app, download("/1/first.png")).await;
    assert_eq!(body_bytes(response).await, b"one");
    let response = send(&app, download("/2/third.jpg")).await;
    assert_eq!(body_bytes(response).await, b"three");
}

#[tokio::test]
async fn test_multipart_without_parts() {
    let backend = CountingBackend::new();
    let app = app(backend.clone());

    let response = send(&app, multipart(multipart_body(&[]))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));

    let request = Request::post("/")
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, 2)
        .body(Body::from("{}"))
        .expect("request");
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_broken_multipart_framing_is_bad_request() {
    let app = app(Arc::new(MemoryStorage::new().expect("memory storage")));

    let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"1\"")
        .into_bytes();
    let response = send(&app, multipart(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_backend() {
    let app = app(CountingBackend::new());

    let response = send(&app, download("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], "counting");
}
