//! Router-level tests driven through tower's oneshot, no listener.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use silohub_server::config::AppConfig;
use silohub_server::{build_app, build_state, spawn_workers};
use tower::ServiceExt;

/// App with worker loops and a backend that completes submissions on
/// its own, so lifecycle progress is observable through the API alone.
fn app() -> Router {
    let mut cfg = AppConfig::default();
    cfg.provisioning.auto_complete = true;
    let state = build_state(&cfg);
    spawn_workers(&state);
    build_app(state)
}

/// App without worker loops: registered tenants stay Pending.
fn app_without_workers() -> Router {
    build_app(build_state(&AppConfig::default()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn register(app: &Router, name: &str) -> String {
    let (status, body) = send(app, post_json("/tenants", json!({ "tenantName": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["tenantId"].as_str().unwrap().to_string()
}

/// Polls GET /tenants/{id} until the tenant reaches the wanted status.
async fn wait_for_status(app: &Router, tenant_id: &str, wanted: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let (status, body) = send(app, get(&format!("/tenants/{tenant_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == wanted {
            return body;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "tenant {tenant_id} stuck in {}, wanted {wanted}",
            body["status"]
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_health() {
    let app = app_without_workers();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_returns_tenant_id() {
    let app = app_without_workers();
    let tenant_id = register(&app, "Acme Corp").await;

    let (status, body) = send(&app, get(&format!("/tenants/{tenant_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenantName"], "Acme Corp");
    assert_eq!(body["safeName"], "acmecorp");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let app = app_without_workers();
    register(&app, "Acme").await;

    let (status, body) = send(&app, post_json("/tenants", json!({ "tenantName": "Acme" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_blank_name_is_bad_request() {
    let app = app_without_workers();
    let (status, _) = send(&app, post_json("/tenants", json!({ "tenantName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_tenant_is_not_found() {
    let app = app_without_workers();
    let (status, body) = send(&app, get("/tenants/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_list_pagination() {
    let app = app_without_workers();
    for name in ["A", "B", "C"] {
        register(&app, name).await;
    }

    let (status, body) = send(&app, get("/tenants?offset=0&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["has_more"], true);

    let (_, body) = send(&app, get("/tenants?offset=2&limit=2")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn test_delete_pending_tenant_is_conflict() {
    let app = app_without_workers();
    let tenant_id = register(&app, "Acme").await;

    let (status, body) = send(&app, delete(&format!("/tenants/{tenant_id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_resources_before_active_is_conflict() {
    let app = app_without_workers();
    let tenant_id = register(&app, "Acme").await;

    let (status, _) = send(&app, get(&format!("/tenants/{tenant_id}/resources"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_retry_without_failure_is_conflict() {
    let app = app_without_workers();
    let tenant_id = register(&app, "Acme").await;

    let (status, _) = send(&app, post_json(&format!("/tenants/{tenant_id}/retry"), json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lifecycle_through_the_api() {
    let app = app();
    let tenant_id = register(&app, "Acme Corp").await;

    // The feed consumer provisions, the backend auto-completes, the
    // reconciler activates
    let record = wait_for_status(&app, &tenant_id, "active").await;
    assert!(record["stackId"].is_string());

    // Resources are visible while active
    let (status, body) = send(&app, get(&format!("/tenants/{tenant_id}/resources"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    // Teardown is accepted and completes asynchronously
    let (status, body) = send(&app, delete(&format!("/tenants/{tenant_id}"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "deleting");

    let record = wait_for_status(&app, &tenant_id, "deleted").await;
    assert_eq!(record["status"], "deleted");

    // The audit record survives; a second delete is refused
    let (status, _) = send(&app, delete(&format!("/tenants/{tenant_id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
