use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Request, StatusCode, header};
use bytes::Bytes;
use tower::ServiceExt;

use gitdrop::routes::routes::routes;
use gitdrop::services::rate_limit::RateLimiter;
use gitdrop::services::store::{RemoteStore, StoreError, StoreResult, StoredObject};
use gitdrop::state::AppState;

const MAX_FILE_SIZE: u64 = 1024 * 1024;
const BOUNDARY: &str = "gitdrop-test-boundary";

// -- In-memory store ------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredEntry {
    name: String,
    path: String,
    bytes: Bytes,
    url: String,
}

struct MemoryStore {
    objects: Mutex<Vec<StoredEntry>>,
    clock: AtomicI64,
    fail_store: bool,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            clock: AtomicI64::new(1_700_000_000_000),
            fail_store: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_store: true,
            ..Self::new()
        }
    }

    fn stored(&self) -> Vec<StoredEntry> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn store(&self, name: &str, bytes: Bytes) -> StoreResult<StoredObject> {
        if self.fail_store {
            return Err(StoreError::Api {
                status: 401,
                body: "Bad credentials".into(),
            });
        }
        let millis = self.clock.fetch_add(1, Ordering::SeqCst);
        let path = format!("uploads/{}-{}", millis, name);
        let url = format!("https://files.test/{}", path);
        self.objects.lock().unwrap().push(StoredEntry {
            name: name.to_string(),
            path: path.clone(),
            bytes,
            url: url.clone(),
        });
        Ok(StoredObject { path, raw_url: url })
    }

    async fn resolve(&self, name: &str) -> StoreResult<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .rev()
            .find(|entry| entry.name == name)
            .map(|entry| entry.url.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// -- Helpers --------------------------------------------------------------

fn build_app(store: Arc<MemoryStore>, max_requests: u32) -> axum::Router {
    let store: Arc<dyn RemoteStore> = store;
    let state = AppState {
        store,
        limiter: RateLimiter::new(max_requests, Duration::from_secs(60)),
        max_file_size: MAX_FILE_SIZE,
        public_base_url: "http://localhost:3000".to_string(),
    };
    routes(MAX_FILE_SIZE).with_state(state)
}

fn multipart_body(field_name: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(filename: &str, content: &[u8], client: &str) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", client)
        .body(Body::from(multipart_body("file", filename, content)))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn healthz_returns_200() {
    let app = build_app(Arc::new(MemoryStore::new()), 10);

    let response = app.oneshot(get_request("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn readyz_reports_store_reachable() {
    let app = build_app(Arc::new(MemoryStore::new()), 10);

    let response = app.oneshot(get_request("/readyz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["checks"]["remote_store"]["ok"], true);
}

#[tokio::test]
async fn upload_descriptor_has_no_side_effects() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let response = app.oneshot(get_request("/api/upload")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["endpoint"], "/api/upload");
    assert_eq!(json["method"], "POST");
    assert_eq!(json["maxFileSize"], "1MB");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn upload_sanitises_name_and_returns_retrieval_url() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let response = app
        .oneshot(upload_request("report final.pdf", b"0123456789", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "9"
    );
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["filename"], "report_final.pdf");
    assert_eq!(json["size"], 10);
    assert_eq!(json["url"], "http://localhost:3000/file/report_final.pdf");
    assert_eq!(json["message"], "File uploaded successfully");

    let stored = store.stored();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].path.starts_with("uploads/"));
    assert!(stored[0].path.ends_with("-report_final.pdf"));
    assert_eq!(&stored[0].bytes[..], b"0123456789");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("attachment", "a.txt", b"hello")))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "No file provided");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn executable_upload_is_rejected_without_commit() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let response = app
        .oneshot(upload_request("virus.exe", b"MZ", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "File type not allowed for security reasons");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let response = app
        .oneshot(upload_request("notes.txt", b"", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File is empty");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn oversized_upload_reports_limit_in_message() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let content = vec![0u8; MAX_FILE_SIZE as usize + 1];
    let response = app
        .oneshot(upload_request("big.bin", &content, "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File too large. Max size: 1MB");
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn rate_limit_rejects_after_quota_with_retry_hint() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 2);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(upload_request("a.txt", b"hello", "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(upload_request("a.txt", b"hello", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Rate limit exceeded");
    let retry_after = json["retryAfter"].as_i64().unwrap();
    assert!((0..=60).contains(&retry_after));

    // The rejected request committed nothing.
    assert_eq!(store.stored().len(), 2);
}

#[tokio::test]
async fn rate_limit_buckets_by_forwarded_client() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store, 1);

    let first = app
        .clone()
        .oneshot(upload_request("a.txt", b"hello", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let same_client = app
        .clone()
        .oneshot(upload_request("b.txt", b"hello", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(same_client.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app
        .oneshot(upload_request("c.txt", b"hello", "198.51.100.7"))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::OK);
}

#[tokio::test]
async fn uploaded_file_round_trips_through_retrieval() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    let response = app
        .clone()
        .oneshot(upload_request("report final.pdf", b"0123456789", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/file/report_final.pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get(header::LOCATION).unwrap();
    let stored = store.stored();
    assert_eq!(location, stored[0].url.as_str());
    assert_eq!(&stored[0].bytes[..], b"0123456789");
}

#[tokio::test]
async fn retrieval_works_under_the_api_prefix() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store, 10);

    let response = app
        .clone()
        .oneshot(upload_request("a.txt", b"hello", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/api/file/a.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn reupload_resolves_to_the_newest_copy() {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(store.clone(), 10);

    for content in [b"first".as_slice(), b"second".as_slice()] {
        let response = app
            .clone()
            .oneshot(upload_request("a.txt", content, "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request("/file/a.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let stored = store.stored();
    assert_eq!(stored.len(), 2);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        stored[1].url.as_str()
    );
}

#[tokio::test]
async fn missing_file_returns_404_with_fixed_message() {
    let app = build_app(Arc::new(MemoryStore::new()), 10);

    let response = app.oneshot(get_request("/file/nope.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn store_failure_surfaces_as_500_without_partial_state() {
    let store = Arc::new(MemoryStore::failing());
    let app = build_app(store.clone(), 10);

    let response = app
        .oneshot(upload_request("a.txt", b"hello", "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("HTTP 401"));
    assert!(store.stored().is_empty());
}
