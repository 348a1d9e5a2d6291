use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;
use unfurl_engine::{FetchError, FetchMetadata, FetchOutput, Fetcher, UnfurlSettings, Unfurler};
use unfurl_server::{build_router, AppState};
use url::Url;

/// Serves one fixed HTML page for every URL.
struct FixedPage(&'static str);

#[async_trait::async_trait]
impl Fetcher for FixedPage {
    async fn fetch(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        Ok(FetchOutput {
            bytes: self.0.as_bytes().to_vec(),
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                redirect_count: 0,
                content_type: Some("text/html".into()),
                byte_len: self.0.len() as u64,
                truncated: false,
            },
        })
    }
}

/// Panics on use, standing in for an unexpected internal failure.
struct Exploding;

#[async_trait::async_trait]
impl Fetcher for Exploding {
    async fn fetch(&self, _url: &Url) -> Result<FetchOutput, FetchError> {
        panic!("fetcher exploded");
    }
}

fn app(fetcher: Arc<dyn Fetcher>) -> Router {
    let unfurler = Unfurler::with_fetcher(UnfurlSettings::default(), fetcher).unwrap();
    build_router(Arc::new(AppState {
        unfurler: Arc::new(unfurler),
    }))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let cache = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cache, json)
}

#[tokio::test]
async fn valid_url_returns_data_with_no_store() {
    let app = app(Arc::new(FixedPage(
        r#"<meta property="og:title" content="Guest"><meta property="og:site_name" content="Book">"#,
    )));
    let (status, cache, json) = get(app, "/api/unfurl?url=https%3A%2F%2Fexample.com%2Fpost").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("no-store, max-age=0"));
    assert_eq!(json["data"]["url"], "https://example.com/post");
    assert_eq!(json["data"]["title"], "Guest");
    assert_eq!(json["data"]["site_name"], "Book");
    assert_eq!(json["data"]["image"], "");
}

#[tokio::test]
async fn missing_url_is_a_bad_request() {
    let (status, cache, json) = get(app(Arc::new(FixedPage(""))), "/api/unfurl").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(cache.as_deref(), Some("no-store, max-age=0"));
    assert_eq!(json["error"], "missing url");
}

#[tokio::test]
async fn blocked_and_invalid_targets_are_bad_requests() {
    for uri in [
        "/api/unfurl?url=http%3A%2F%2F127.0.0.1%2F",
        "/api/unfurl?url=http%3A%2F%2Flocalhost%2F",
        "/api/unfurl?url=ftp%3A%2F%2Fexample.com%2F",
        "/api/unfurl?url=nonsense",
    ] {
        let (status, _, json) = get(app(Arc::new(FixedPage(""))), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let message = json["error"].as_str().unwrap();
        assert!(
            message.contains("blocked") || message.contains("invalid"),
            "{uri}: {message}"
        );
    }
}

#[tokio::test]
async fn internal_panic_maps_to_server_error() {
    let (status, cache, json) = get(
        app(Arc::new(Exploding)),
        "/api/unfurl?url=https%3A%2F%2Fexample.com%2F",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(cache.as_deref(), Some("no-store, max-age=0"));
    assert_eq!(json["error"], "unfurl error");
}

#[tokio::test]
async fn health_check_answers_ok() {
    let response = app(Arc::new(FixedPage("")))
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
