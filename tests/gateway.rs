//! Forwarding surface: calls pass through the shared registry, and the admin
//! surface reports the state they leave behind.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::*;
use storefront_mesh::admin::{setup_admin_router, AdminState};
use storefront_mesh::gateway::setup_gateway_router;
use storefront_mesh::transport::X_REQUEST_ID;
use storefront_mesh::{ResilientCaller, TargetRegistry, TargetSpec};

const KEY: &str = "test-admin-key";

struct Mesh {
    gateway: Router,
    admin: Router,
    transport: Arc<StubTransport>,
}

fn mesh(transport: Arc<StubTransport>) -> Mesh {
    let mut registry = TargetRegistry::new();
    registry
        .register_target(
            TargetSpec::new("product-service", "http://127.0.0.1:9002")
                .retry(retry(2))
                .circuit_breaker(breaker(2, 2, 50.0, 1_000))
                .rate_limit(rate_limit(20, 60_000)),
        )
        .unwrap();
    let registry = Arc::new(registry);

    Mesh {
        gateway: setup_gateway_router(ResilientCaller::new(registry.clone(), transport.clone())),
        admin: setup_admin_router(AdminState::new(registry, KEY)),
        transport,
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get(X_REQUEST_ID)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, request_id, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_forwards_path_query_and_body() {
    let mesh = mesh(StubTransport::new(|_, _| status(200, r#"{"id":4,"stock":12}"#)));

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/product-service/api/products/4/stock?source=checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .header(X_REQUEST_ID, "req-42")
        .body(Body::from(r#"{"delta":-1}"#))
        .unwrap();
    let (status, request_id, body) = send(mesh.gateway, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.as_deref(), Some("req-42"));
    assert_eq!(body["stock"], 12);

    let seen = mesh.transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::PUT);
    assert_eq!(seen[0].path, "/api/products/4/stock?source=checkout");
    assert_eq!(seen[0].request_id(), Some("req-42"));
    assert_eq!(seen[0].body.as_deref(), Some(&br#"{"delta":-1}"#[..]));
}

#[tokio::test(start_paused = true)]
async fn test_non_idempotent_methods_are_not_retried() {
    let mesh = mesh(StubTransport::new(|_, _| status(502, "")));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/product-service/api/products")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(mesh.gateway, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "transient");
    assert_eq!(mesh.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_target_and_client_errors() {
    let mesh = mesh(StubTransport::new(|_, _| status(404, "{}")));

    let (status, _, body) = send(mesh.gateway.clone(), get("/order-service/api/orders/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_target");
    assert_eq!(mesh.transport.calls(), 0);

    let (status, _, body) = send(mesh.gateway, get("/product-service/api/products/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "permanent");
    assert_eq!(mesh.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_forwarded_failures_show_in_admin_and_recover_after_cool_down() {
    let mesh = mesh(StubTransport::always_failing());

    let (_, _, before) = send(mesh.admin.clone(), admin_get("/admin/targets/product-service")).await;
    assert_eq!(before["circuit_state"], "closed");
    assert_eq!(before["available_permits"], 20);

    // Two failed attempts trip the breaker; the next call is refused.
    let (status, _, _) = send(mesh.gateway.clone(), get("/product-service/api/products/4")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (status, _, body) = send(mesh.gateway.clone(), get("/product-service/api/products/4")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "circuit_open");
    assert_eq!(mesh.transport.calls(), 2);

    let (_, _, after) = send(mesh.admin.clone(), admin_get("/admin/targets/product-service")).await;
    assert_eq!(after["circuit_state"], "open");
    assert_eq!(after["times_opened"], 1);
    assert_eq!(after["rejected_calls"], 1);
    assert_eq!(after["available_permits"], 18);

    let (status, _, ready) = send(mesh.admin.clone(), get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["ready"], false);

    // No traffic arrives, yet readiness recovers once the cool-down passes.
    tokio::time::advance(Duration::from_secs(3_600)).await;
    let (status, _, ready) = send(mesh.admin.clone(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["targets"][0]["circuit_state"], "half_open");

    let (_, _, status_body) = send(mesh.admin, admin_get("/admin/status")).await;
    assert_eq!(status_body["status"], "operational");
    assert_eq!(mesh.transport.calls(), 2);
}
