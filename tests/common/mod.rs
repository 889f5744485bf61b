//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use storefront_mesh::config::{CircuitBreakerConfig, RateLimitConfig, RetryConfig};
use storefront_mesh::transport::{InboundResponse, OutboundRequest, Transport, TransportError};
use storefront_mesh::{ResilientCaller, TargetRegistry, TargetSpec};

type Responder = dyn Fn(u32, &OutboundRequest) -> Result<InboundResponse, TransportError> + Send + Sync;

/// In-memory transport that counts calls and answers from a closure.
pub struct StubTransport {
    calls: AtomicU32,
    delay: Option<Duration>,
    responder: Box<Responder>,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl StubTransport {
    pub fn new(
        responder: impl Fn(u32, &OutboundRequest) -> Result<InboundResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay: None,
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Answer every call after `delay`.
    pub fn delayed(
        delay: Duration,
        responder: impl Fn(u32, &OutboundRequest) -> Result<InboundResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay: Some(delay),
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::new(|_, _| Err(TransportError::Connect("connection refused".into())))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<OutboundRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, _base_url: &Url, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(n, &request)
    }
}

pub fn status(code: u16, body: &str) -> Result<InboundResponse, TransportError> {
    Ok(InboundResponse::new(StatusCode::from_u16(code).unwrap(), body.to_string()))
}

pub fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        enabled: true,
        max_attempts,
        base_delay_ms: 50,
        max_delay_ms: 500,
    }
}

pub fn breaker(window_size: usize, minimum_calls: usize, threshold: f64, cool_down_ms: u64) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        window_size,
        minimum_calls,
        failure_rate_threshold: threshold,
        cool_down_ms,
        half_open_max_calls: 1,
    }
}

pub fn rate_limit(permits_per_window: u32, window_ms: u64) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        permits_per_window,
        window_ms,
    }
}

/// A caller over a single target.
pub fn caller_for(spec: TargetSpec, transport: Arc<StubTransport>) -> ResilientCaller {
    callers_for(vec![spec], transport)
}

pub fn callers_for(specs: Vec<TargetSpec>, transport: Arc<StubTransport>) -> ResilientCaller {
    let mut registry = TargetRegistry::new();
    for spec in specs {
        registry.register_target(spec).unwrap();
    }
    ResilientCaller::new(Arc::new(registry), transport)
}

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Mock HTTP backend on an ephemeral port. The responder gets the 1-based
/// request number and the parsed request and returns status, body, and an
/// optional delay before answering.
pub async fn start_programmable_backend<F>(responder: F) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>)
where
    F: Fn(u32, &RecordedRequest) -> (u16, String, Option<Duration>) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responder = Arc::new(responder);
    let counter = Arc::new(AtomicU32::new(0));
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let responder = responder.clone();
            let counter = counter.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, responder.as_ref(), &counter, &log).await;
            });
        }
    });

    (addr, recorded)
}

async fn serve_one<F>(
    mut socket: TcpStream,
    responder: &F,
    counter: &AtomicU32,
    log: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()>
where
    F: Fn(u32, &RecordedRequest) -> (u16, String, Option<Duration>),
{
    let request = read_request(&mut socket).await?;
    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
    log.lock().unwrap().push(request.clone());

    let (code, body, delay) = responder(n, &request);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let response = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (head_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[head_end..body_end]).into_owned();

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}
