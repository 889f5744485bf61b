//! Fallback policies for call sites.
//!
//! A fallback sees the original request and the failure cause and either
//! substitutes a degraded value or raises [`ServiceUnavailable`].

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::CallError;
use crate::transport::OutboundRequest;

/// The only error business logic receives from a resilient call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target} unavailable for {operation}: {cause}")]
pub struct ServiceUnavailable {
    pub target: String,
    pub operation: String,
    pub cause: CallError,
}

/// What a fallback chose to do with a failed call.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackDecision<T> {
    Substitute(T),
    Raise,
}

type Handler<T> = dyn Fn(&OutboundRequest, &CallError) -> FallbackDecision<T> + Send + Sync;

/// Per-call-site fallback.
pub struct Fallback<T> {
    handler: Arc<Handler<T>>,
}

impl<T: 'static> Fallback<T> {
    /// Always raise `ServiceUnavailable`.
    pub fn raise() -> Self {
        Self::decide(|_, _| FallbackDecision::Raise)
    }

    /// Always substitute a value derived from the request and cause.
    pub fn substitute(f: impl Fn(&OutboundRequest, &CallError) -> T + Send + Sync + 'static) -> Self {
        Self::decide(move |request, cause| FallbackDecision::Substitute(f(request, cause)))
    }

    /// Substitute a fixed value.
    pub fn value(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::decide(move |_, _| FallbackDecision::Substitute(value.clone()))
    }

    /// Choose per failure.
    pub fn decide(
        f: impl Fn(&OutboundRequest, &CallError) -> FallbackDecision<T> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Arc::new(f) }
    }

    /// Run the fallback for a failed call.
    pub fn apply(
        &self,
        target: &str,
        operation: &str,
        request: &OutboundRequest,
        cause: CallError,
    ) -> Result<T, ServiceUnavailable> {
        match (self.handler)(request, &cause) {
            FallbackDecision::Substitute(value) => {
                tracing::warn!(
                    target_name = %target,
                    operation = %operation,
                    cause = %cause,
                    "Call failed, substituting fallback value"
                );
                metrics::record_fallback(target, operation, "substitute");
                Ok(value)
            }
            FallbackDecision::Raise => {
                tracing::warn!(
                    target_name = %target,
                    operation = %operation,
                    cause = %cause,
                    "Call failed, raising service unavailable"
                );
                metrics::record_fallback(target, operation, "raise");
                Err(ServiceUnavailable {
                    target: target.to_string(),
                    operation: operation.to_string(),
                    cause,
                })
            }
        }
    }
}

impl<T> Clone for Fallback<T> {
    fn clone(&self) -> Self {
        Self { handler: Arc::clone(&self.handler) }
    }
}

impl<T> fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback").finish_non_exhaustive()
    }
}
