//! Outbound request and inbound response payloads.
//!
//! # Responsibilities
//! - Describe one call to a target independent of the wire client
//! - Carry a correlation ID (`x-request-id`) on every attempt
//! - Decode JSON response bodies into typed results

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::transport::TransportError;

/// Header carrying the correlation ID across services.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A call to be sent to a target, relative to its base address.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path and query, e.g. `/api/users/7`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a header. Invalid names or values are reported, not dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = HeaderName::try_from(name)
            .map_err(|e| TransportError::InvalidRequest(format!("header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serialize `payload` as the JSON body.
    pub fn with_json<T: Serialize>(mut self, payload: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| TransportError::InvalidRequest(format!("body serialization: {e}")))?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// The correlation ID, if one was set by the caller.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Ensure a correlation ID is present and return it.
    pub fn ensure_request_id(&mut self) -> String {
        if let Some(id) = self.request_id() {
            return id.to_string();
        }
        let id = Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&id) {
            self.headers.insert(X_REQUEST_ID, value);
        }
        id
    }
}

/// A response received from a target.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// A 200 response with a JSON body.
    pub fn json_ok<T: Serialize>(payload: &T) -> Self {
        let body = serde_json::to_vec(payload).unwrap_or_default();
        Self::new(StatusCode::OK, body)
    }

    /// Decode the body as JSON. An empty body decodes as `null`, so `()`
    /// and `Option<_>` results work for 204-style responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Body as text for error reporting, truncated.
    pub fn body_excerpt(&self) -> String {
        const LIMIT: usize = 512;
        let text = String::from_utf8_lossy(&self.body);
        match text.char_indices().nth(LIMIT) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.into_owned(),
        }
    }
}
