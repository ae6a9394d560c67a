//! API integration tests.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use muzhack_api::{create_router, ApiConfig, AppState};
use muzhack_media::{DocumentRenderer, MediaError, MediaResult};
use muzhack_storage::{ArtifactStore, StorageResult};
use muzhack_worker::WorkerConfig;

struct NullStore;

#[async_trait]
impl ArtifactStore for NullStore {
    async fn upload(&self, _local: &Path, _remote: &str, _content_type: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn make_public(&self, remote_path: &str) -> StorageResult<String> {
        Ok(format!("https://cdn.test/{}", remote_path))
    }
}

/// Renderer that either writes a stub document or fails like a crashed pandoc.
struct StubRenderer {
    fail: bool,
    available: bool,
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(&self, _input: &Path, output: &Path) -> MediaResult<Duration> {
        if self.fail {
            return Err(MediaError::render_failed("pandoc exited with 43", None, Some(43)));
        }
        tokio::fs::write(output, b"%PDF-1.4 stub").await?;
        Ok(Duration::from_millis(1))
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

fn app(work_dir: &Path, renderer: StubRenderer) -> Router {
    let worker_config = WorkerConfig {
        work_dir: work_dir.to_path_buf(),
        fetch_timeout: Duration::from_secs(5),
        ..WorkerConfig::default()
    };
    let state = AppState::with_collaborators(
        ApiConfig::default(),
        &worker_config,
        Arc::new(NullStore),
        Arc::new(renderer),
    )
    .unwrap();
    let handle = PrometheusBuilder::new().build_recorder().handle();
    create_router(state, Some(handle))
}

fn ok_renderer() -> StubRenderer {
    StubRenderer { fail: false, available: true }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255])));
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    buf
}

fn post_job(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["work_dir"]["status"], "ok");
}

#[tokio::test]
async fn test_ready_degraded_without_renderer() {
    let dir = TempDir::new().unwrap();
    let renderer = StubRenderer { fail: false, available: false };
    let response = app(dir.path(), renderer)
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["renderer"]["status"], "error");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["X-Request-ID"], "req-123");
}

#[tokio::test]
async fn test_submit_job_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pics/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1000, 500)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(post_job(json!({
            "id": "p1",
            "name": "Synth",
            "bom": "- 1x knob",
            "instructions": "Solder it.",
            "pictures": [
                { "url": format!("{}/pics/a.png", server.uri()), "name": "a.png", "cloudPath": "u/p/a.png" }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let picture = &body["pictures"][0];
    assert_eq!(picture["name"], "a.png");
    assert_eq!(picture["cloudPath"], "u/p/a.png");
    assert_eq!(picture["thumbNailUrl"], "https://cdn.test/u/p/a-thumb.png");
    assert_eq!(picture["exploreUrl"], "https://cdn.test/u/p/a-explore.png");
    assert_eq!(picture["mainUrl"], "https://cdn.test/u/p/a-main.png");
    assert!(body["document"]["pdf"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs")
                .header("content-type", "application/json")
                .body(Body::from("{\"pictures\": 3"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "InvalidJob");
}

#[tokio::test]
async fn test_unsafe_job_id_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(post_job(json!({ "id": "..", "title": "Synth" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "InvalidJob");
}

#[tokio::test]
async fn test_missing_picture_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pics/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(post_job(json!({
            "id": "p1",
            "title": "Synth",
            "pictures": [
                { "url": format!("{}/pics/gone.png", server.uri()), "name": "gone.png", "cloudDirectory": "u/p" }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["code"], "FetchError.NotFound");
    assert!(body["detail"].as_str().unwrap().contains("gone.png"));
}

#[tokio::test]
async fn test_render_failure_keeps_error_kind() {
    let dir = TempDir::new().unwrap();
    let renderer = StubRenderer { fail: true, available: true };
    let response = app(dir.path(), renderer)
        .oneshot(post_job(json!({ "id": "p1", "title": "Synth" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["code"], "RenderError");
    assert!(body["detail"].as_str().unwrap().contains("43"));
}

#[tokio::test]
async fn test_picture_named_like_a_variant_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path(), ok_renderer())
        .oneshot(post_job(json!({
            "id": "p1",
            "title": "Synth",
            "pictures": [
                { "url": "https://example.com/a.png", "name": "a.png", "cloudDirectory": "u/p" },
                { "url": "https://example.com/b.png", "name": "a-main.png", "cloudDirectory": "u/p" }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "InvalidJob");
    assert!(body["detail"].as_str().unwrap().contains("a-main.png"));
}
