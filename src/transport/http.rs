//! HTTP transport backed by the hyper client.
//!
//! # Responsibilities
//! - Resolve request paths against a target's base URL
//! - Forward method, headers and body; stamp correlation ID and user agent
//! - Enforce connect and total request timeouts
//! - Buffer the response body up to a configured limit

use async_trait::async_trait;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderValue, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::pin::Pin;
use std::time::Duration;
use tokio::time;
use url::Url;

use crate::config::TimeoutConfig;
use crate::transport::{InboundResponse, OutboundRequest, Transport, TransportError};

const USER_AGENT: &str = "storefront-mesh";

/// Plain-HTTP transport shared by every target.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl HttpTransport {
    pub fn new(config: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_ms)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout: Duration::from_millis(config.request_ms),
            max_body_bytes: config.max_body_bytes,
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<InboundResponse, TransportError> {
        let response = self.client.request(request).await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let (parts, body) = response.into_parts();
        let body = self.read_body(Body::new(body)).await?;

        Ok(InboundResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Buffer the body; exceeding `max_body_bytes` is a `Decode` failure.
    async fn read_body(&self, mut body: Body) -> Result<Bytes, TransportError> {
        let mut buffer = Vec::new();
        while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
            let frame = frame.map_err(|e| TransportError::Network(format!("reading body: {e}")))?;
            if let Ok(data) = frame.into_data() {
                if buffer.len() + data.len() > self.max_body_bytes {
                    return Err(TransportError::Decode(format!(
                        "response body exceeds {} bytes",
                        self.max_body_bytes
                    )));
                }
                buffer.extend_from_slice(&data);
            }
        }
        Ok(Bytes::from(buffer))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&TimeoutConfig::default())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        base_url: &Url,
        mut request: OutboundRequest,
    ) -> Result<InboundResponse, TransportError> {
        let uri = join_uri(base_url, &request.path)?;
        let request_id = request.ensure_request_id();

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
            headers
                .entry(header::USER_AGENT)
                .or_insert(HeaderValue::from_static(USER_AGENT));
        }

        let body = request.body.map(Body::from).unwrap_or_else(Body::empty);
        let outbound = builder
            .body(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            base_url = %base_url,
            path = %request.path,
            "Sending outbound request"
        );

        match time::timeout(self.request_timeout, self.exchange(outbound)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(request_id = %request_id, base_url = %base_url, "Outbound request timed out");
                Err(TransportError::Timeout)
            }
        }
    }
}

/// Append `path` to the base URL, keeping any path prefix on the base.
fn join_uri(base_url: &Url, path: &str) -> Result<Uri, TransportError> {
    let base = base_url.as_str().trim_end_matches('/');
    let full = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    full.parse::<Uri>()
        .map_err(|e| TransportError::InvalidRequest(format!("uri '{full}': {e}")))
}
