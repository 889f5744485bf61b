//! Resilient call composition.
//!
//! # Data Flow
//! ```text
//! Client operation (e.g. get_user_by_id):
//!     → registry lookup (unknown target → fallback)
//!     → rate limiter (exhausted → fallback, transport untouched)
//!     → retry loop
//!         → circuit breaker permit (open → fallback, transport untouched)
//!         → attempt task: transport → classify → decode → record outcome
//!         → backoff on transient failure
//!     → Ok(value) or fallback(request, cause)
//! ```
//!
//! # Design Decisions
//! - One rate-limit permit per logical call; one breaker permit per attempt
//! - Every attempt of a call carries the same `x-request-id`
//! - Callers only ever see `ServiceUnavailable`, never a raw `CallError`

pub mod fallback;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::registry::{Target, TargetRegistry};
use crate::resilience::{execute_with_retry, timeouts::run_detached, CallError, CallOutcome, CallPermit};
use crate::transport::{OutboundRequest, Transport};

pub use fallback::{Fallback, FallbackDecision, ServiceUnavailable};

/// Wraps outbound calls with rate limiting, circuit breaking, retry and
/// fallback. Cheap to clone.
#[derive(Clone)]
pub struct ResilientCaller {
    registry: Arc<TargetRegistry>,
    transport: Arc<dyn Transport>,
}

impl ResilientCaller {
    pub fn new(registry: Arc<TargetRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self { registry, transport }
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    /// Call `target` using its configured retry policy.
    pub async fn call<T>(
        &self,
        target: &str,
        operation: &str,
        request: OutboundRequest,
        fallback: &Fallback<T>,
    ) -> Result<T, ServiceUnavailable>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.call_with_retry(target, operation, None, request, fallback).await
    }

    /// Call `target`, overriding its retry policy when `retry` is set.
    pub async fn call_with_retry<T>(
        &self,
        target: &str,
        operation: &str,
        retry: Option<&RetryConfig>,
        mut request: OutboundRequest,
        fallback: &Fallback<T>,
    ) -> Result<T, ServiceUnavailable>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request_id = request.ensure_request_id();

        let Some(resolved) = self.registry.get(target) else {
            tracing::error!(target_name = %target, operation = %operation, "Call to unregistered target");
            metrics::record_rejection(target, "unknown_target");
            let cause = CallError::UnknownTarget { target: target.to_string() };
            return fallback.apply(target, operation, &request, cause);
        };

        if !resolved.limiter.try_acquire() {
            tracing::debug!(target_name = %target, operation = %operation, request_id = %request_id, "Rate limit exceeded");
            metrics::record_rejection(target, "rate_limited");
            let cause = CallError::RateLimited { target: target.to_string() };
            return fallback.apply(target, operation, &request, cause);
        }

        let retry = retry.unwrap_or(&resolved.retry);
        let result = execute_with_retry(retry, &resolved.breaker, |attempt, permit| {
            let attempt_future = run_attempt::<T>(
                self.transport.clone(),
                resolved.clone(),
                operation.to_string(),
                request.clone(),
                permit,
            );
            tracing::debug!(target_name = %target, operation = %operation, request_id = %request_id, attempt, "Starting attempt");
            run_detached(attempt_future, resolved.call_timeout)
        })
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(cause) => {
                if let CallError::CircuitOpen { .. } = cause {
                    metrics::record_rejection(target, "circuit_open");
                }
                fallback.apply(target, operation, &request, cause)
            }
        }
    }
}

impl std::fmt::Debug for ResilientCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientCaller")
            .field("targets", &self.registry.names())
            .finish()
    }
}

/// One attempt. Runs as its own task and records its outcome on the
/// breaker even if the caller has stopped waiting.
async fn run_attempt<T>(
    transport: Arc<dyn Transport>,
    target: Arc<Target>,
    operation: String,
    request: OutboundRequest,
    permit: CallPermit,
) -> CallOutcome<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let started = Instant::now();
    let result = transport.send(&target.base_url, request).await;
    let outcome = target
        .classifier
        .classify(result)
        .and_then(|response| response.json::<T>());

    permit.record(outcome.signal(target.record_permanent_failures));
    metrics::record_call(&target.name, &operation, outcome.label(), started);

    match &outcome {
        CallOutcome::Success(_) => {}
        CallOutcome::TransientFailure(e) => {
            tracing::debug!(target_name = %target.name, operation = %operation, error = %e, "Attempt failed (transient)");
        }
        CallOutcome::PermanentFailure(e) => {
            tracing::debug!(target_name = %target.name, operation = %operation, error = %e, "Attempt failed (permanent)");
        }
    }
    outcome
}

/// A named operation against one target with its own fallback.
#[derive(Debug, Clone)]
pub struct CallSite<T> {
    pub target: String,
    pub operation: String,
    pub retry: Option<RetryConfig>,
    pub fallback: Fallback<T>,
}

impl<T> CallSite<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(target: impl Into<String>, operation: impl Into<String>, fallback: Fallback<T>) -> Self {
        Self {
            target: target.into(),
            operation: operation.into(),
            retry: None,
            fallback,
        }
    }

    /// Override the target's retry policy for this call site only.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub async fn invoke(
        &self,
        caller: &ResilientCaller,
        request: OutboundRequest,
    ) -> Result<T, ServiceUnavailable> {
        caller
            .call_with_retry(&self.target, &self.operation, self.retry.as_ref(), request, &self.fallback)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::registry::TargetSpec;
    use crate::transport::{InboundResponse, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl Transport for Flaky {
        async fn send(&self, _: &Url, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_first {
                return Err(TransportError::Connect("refused".into()));
            }
            Ok(InboundResponse::json_ok(&request.request_id().map(str::to_string)))
        }
    }

    fn caller(fail_first: u32, spec: TargetSpec) -> (ResilientCaller, Arc<Flaky>) {
        let mut registry = TargetRegistry::new();
        registry.register_target(spec).unwrap();
        let transport = Arc::new(Flaky { calls: AtomicU32::new(0), fail_first });
        (ResilientCaller::new(Arc::new(registry), transport.clone()), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_share_request_id() {
        let (caller, transport) = caller(2, TargetSpec::new("user-service", "http://127.0.0.1:9"));
        let request = OutboundRequest::get("/api/users/1").with_header("x-request-id", "abc").unwrap();

        let echoed: Option<String> = caller
            .call("user-service", "get_user", request, &Fallback::raise())
            .await
            .unwrap();
        assert_eq!(echoed.as_deref(), Some("abc"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_target_goes_to_fallback() {
        let (caller, transport) = caller(0, TargetSpec::new("user-service", "http://127.0.0.1:9"));
        let err = caller
            .call::<()>("inventory-service", "reserve", OutboundRequest::post("/reserve"), &Fallback::raise())
            .await
            .unwrap_err();
        assert_eq!(err.cause, CallError::UnknownTarget { target: "inventory-service".into() });
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_call_skips_transport() {
        let spec = TargetSpec::new("user-service", "http://127.0.0.1:9").rate_limit(RateLimitConfig {
            enabled: true,
            permits_per_window: 1,
            window_ms: 60_000,
        });
        let (caller, transport) = caller(0, spec);
        let fallback = Fallback::value(None::<String>);

        let first = caller.call("user-service", "get_user", OutboundRequest::get("/"), &fallback).await;
        assert!(first.unwrap().is_some());
        let second = caller.call("user-service", "get_user", OutboundRequest::get("/"), &fallback).await;
        assert_eq!(second, Ok(None));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_site_retry_override() {
        let (caller, transport) = caller(5, TargetSpec::new("product-service", "http://127.0.0.1:9"));
        let site = CallSite::new("product-service", "update_stock", Fallback::<()>::raise())
            .with_retry(RetryConfig { enabled: false, ..RetryConfig::default() });

        let err = site.invoke(&caller, OutboundRequest::put("/stock")).await.unwrap_err();
        assert!(matches!(err.cause, CallError::Transient(TransportError::Connect(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
