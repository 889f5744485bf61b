//! Forwarding surface of the gateway binary.
//!
//! # Data Flow
//! ```text
//! ANY /{target}/{*path}?query
//!     → buffer body (1MB)
//!     → OutboundRequest (content-type, accept, x-request-id copied)
//!     → ResilientCaller::call_with_retry (single attempt unless idempotent)
//!     → 200 + JSON body, or a status derived from the failure cause
//! ```
//!
//! # Design Decisions
//! - Every forwarded call goes through the same registry the admin surface
//!   reports on, so breaker and limiter snapshots reflect real traffic
//! - Non-idempotent methods are never retried
//! - Targets speak JSON; a non-JSON success body is a permanent failure

use axum::{
    body::{self, Body},
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::caller::{Fallback, ResilientCaller, ServiceUnavailable};
use crate::config::RetryConfig;
use crate::resilience::CallError;
use crate::transport::{OutboundRequest, TransportError, X_REQUEST_ID};

const MAX_FORWARDED_BODY: usize = 1024 * 1024;

const OPERATION: &str = "forward";

/// Router forwarding `/{target}/{*path}` through `caller`.
pub fn setup_gateway_router(caller: ResilientCaller) -> Router {
    Router::new()
        .route("/{target}/{*path}", any(forward))
        .layer(TraceLayer::new_for_http())
        .with_state(caller)
}

async fn forward(
    State(caller): State<ResilientCaller>,
    Path((target, path)): Path<(String, String)>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match body::to_bytes(body, MAX_FORWARDED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(target_name = %target, error = %e, "Rejected forwarded body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut upstream_path = format!("/{path}");
    if let Some(query) = parts.uri.query() {
        upstream_path.push('?');
        upstream_path.push_str(query);
    }

    let mut outbound = OutboundRequest::new(parts.method.clone(), upstream_path);
    for name in [header::CONTENT_TYPE, header::ACCEPT, HeaderName::from_static(X_REQUEST_ID)] {
        if let Some(value) = parts.headers.get(&name) {
            outbound.headers.insert(name, value.clone());
        }
    }
    if !body.is_empty() {
        outbound.body = Some(body);
    }
    let request_id = outbound.ensure_request_id();

    tracing::debug!(
        target_name = %target,
        method = %parts.method,
        path = %outbound.path,
        request_id = %request_id,
        "Forwarding request"
    );

    let single_attempt = RetryConfig {
        enabled: false,
        ..RetryConfig::default()
    };
    let retry = (!parts.method.is_idempotent()).then_some(&single_attempt);

    let result = caller
        .call_with_retry(&target, OPERATION, retry, outbound, &Fallback::<serde_json::Value>::raise())
        .await;

    let mut response = match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(&err),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Status returned to the client for a failed forward.
pub fn status_for(cause: &CallError) -> StatusCode {
    match cause {
        CallError::UnknownTarget { .. } => StatusCode::NOT_FOUND,
        CallError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CallError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CallError::Transient(TransportError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        // Client errors from the target pass through unchanged.
        CallError::Permanent(TransportError::Status { status, .. }) if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &ServiceUnavailable) -> Response {
    let body = serde_json::json!({
        "error": err.cause.kind(),
        "target": err.target,
        "message": err.to_string(),
    });
    (status_for(&err.cause), Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_causes() {
        let target = || "inventory".to_string();
        assert_eq!(status_for(&CallError::UnknownTarget { target: target() }), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&CallError::RateLimited { target: target() }), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(&CallError::CircuitOpen { target: target() }), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_for(&CallError::Transient(TransportError::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&CallError::Permanent(TransportError::Status { status: 404, body: String::new() })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CallError::Transient(TransportError::Status { status: 503, body: String::new() })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&CallError::Permanent(TransportError::Decode("expected value".into()))),
            StatusCode::BAD_GATEWAY
        );
    }
}
