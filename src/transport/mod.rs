//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! ResilientCaller attempt
//!     → request.rs (OutboundRequest + correlation ID)
//!     → Transport::send (http.rs: hyper client against target base URL)
//!     → InboundResponse or TransportError
//!     → classified by resilience::outcome
//! ```
//!
//! # Design Decisions
//! - The transport never classifies: any HTTP status is a response
//! - One attempt per `send`; retries live above this layer
//! - `Transport` is a trait so tests can count invocations with a stub

pub mod http;
pub mod request;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use http::HttpTransport;
pub use request::{InboundResponse, OutboundRequest, X_REQUEST_ID};

/// Failure of a single outbound attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream responded with status {status}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("attempt aborted: {0}")]
    Aborted(String),
}

/// Issues one outbound call to a target.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(
        &self,
        base_url: &Url,
        request: OutboundRequest,
    ) -> Result<InboundResponse, TransportError>;
}
