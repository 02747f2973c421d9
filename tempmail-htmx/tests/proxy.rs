//! Integration tests for same-origin forwarding
//!
//! A local axum server stands in for smtp.dev and echoes what it received.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::any;
use axum::{Json, Router};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tempmail_htmx::config::TempmailConfig;
use tempmail_htmx::state::AppState;
use tower::ServiceExt;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> (StatusCode, HeaderMap, Json<Value>) {
    let mut response_headers = HeaderMap::new();
    response_headers.insert("x-upstream", "echo".parse().unwrap());
    response_headers.insert("keep-alive", "timeout=5".parse().unwrap());
    let status = if uri.path() == "/missing" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (
        status,
        response_headers,
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "api_key": headers.get("x-api-key").and_then(|v| v.to_str().ok()),
            "host_forwarded": headers.get("host").and_then(|v| v.to_str().ok()) == Some("browser.local"),
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

async fn start_echo() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(any(echo));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app_for(base_url: &str) -> Router {
    let mut config = TempmailConfig::default();
    config.store.persist = false;
    config.api.base_url = base_url.to_string();
    config.api.mercure_url = format!("{base_url}/.well-known/mercure");
    config.api.request_timeout_ms = 2_000;
    tempmail_htmx::router(AppState::with_config(config).unwrap()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_api_prefix_forwards_path_query_and_headers() {
    let upstream = start_echo().await;
    let response = app_for(&upstream)
        .oneshot(
            Request::get("/api/accounts?page=2&address=a%40b.test")
                .header("x-api-key", "smtplabs_proxy")
                .header("host", "browser.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-upstream"], "echo");
    assert!(response.headers().get("keep-alive").is_none());

    let echoed = json_body(response).await;
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/accounts");
    assert_eq!(echoed["query"], "page=2&address=a%40b.test");
    assert_eq!(echoed["api_key"], "smtplabs_proxy");
    assert_eq!(echoed["host_forwarded"], false);
}

#[tokio::test]
async fn test_encoded_path_is_forwarded_verbatim() {
    let upstream = start_echo().await;
    let response = app_for(&upstream)
        .oneshot(
            Request::get("/api/accounts/a%3Fb%2Fc?page=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let echoed = json_body(response).await;
    assert_eq!(echoed["path"], "/accounts/a%3Fb%2Fc");
    assert_eq!(echoed["query"], "page=1");
}

#[tokio::test]
async fn test_request_body_is_forwarded() {
    let upstream = start_echo().await;
    let response = app_for(&upstream)
        .oneshot(
            Request::post("/api/accounts")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"address":"x@y.test"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let echoed = json_body(response).await;
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], r#"{"address":"x@y.test"}"#);
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let upstream = start_echo().await;
    let response = app_for(&upstream)
        .oneshot(Request::get("/api/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mercure_prefix_uses_hub_url() {
    let upstream = start_echo().await;
    let response = app_for(&upstream)
        .oneshot(
            Request::get("/mercure-api/events?topic=accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let echoed = json_body(response).await;
    assert_eq!(echoed["path"], "/.well-known/mercure/events");
    assert_eq!(echoed["query"], "topic=accounts");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let response = app_for(&format!("http://{addr}"))
        .oneshot(Request::get("/api/domains").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_disabled_proxy_is_not_mounted() {
    let mut config = TempmailConfig::default();
    config.store.persist = false;
    config.proxy.enabled = false;
    let app = tempmail_htmx::router(AppState::with_config(config).unwrap()).unwrap();

    let response = app
        .oneshot(Request::get("/api/domains").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
