//! Attempt outcomes and failure classification.
//!
//! # Responsibilities
//! - Tag every attempt as Success, TransientFailure or PermanentFailure
//! - Decide per target which statuses are transient
//! - Translate outcomes into breaker signals
//!
//! # Design Decisions
//! - Connection errors, timeouts and 5xx are always transient
//! - 4xx, decode errors and invalid requests are permanent
//! - Extra transient statuses (408, 429 by default) are per-target config

use thiserror::Error;

use crate::transport::{InboundResponse, TransportError};

/// Result of one attempt against a target.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success(T),
    TransientFailure(TransportError),
    PermanentFailure(TransportError),
}

impl<T> CallOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// Chain a fallible step onto a success; a step error is permanent.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, TransportError>) -> CallOutcome<U> {
        match self {
            CallOutcome::Success(value) => match f(value) {
                Ok(next) => CallOutcome::Success(next),
                Err(e) => CallOutcome::PermanentFailure(e),
            },
            CallOutcome::TransientFailure(e) => CallOutcome::TransientFailure(e),
            CallOutcome::PermanentFailure(e) => CallOutcome::PermanentFailure(e),
        }
    }

    /// How this outcome should be recorded by the circuit breaker.
    pub fn signal(&self, record_permanent_failures: bool) -> BreakerSignal {
        match self {
            CallOutcome::Success(_) => BreakerSignal::Success,
            CallOutcome::TransientFailure(_) => BreakerSignal::Failure,
            CallOutcome::PermanentFailure(_) if record_permanent_failures => BreakerSignal::Failure,
            CallOutcome::PermanentFailure(_) => BreakerSignal::Ignored,
        }
    }

    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Success(_) => "success",
            CallOutcome::TransientFailure(_) => "transient",
            CallOutcome::PermanentFailure(_) => "permanent",
        }
    }

    pub fn into_result(self) -> Result<T, CallError> {
        match self {
            CallOutcome::Success(value) => Ok(value),
            CallOutcome::TransientFailure(e) => Err(CallError::Transient(e)),
            CallOutcome::PermanentFailure(e) => Err(CallError::Permanent(e)),
        }
    }
}

/// What an attempt contributes to the breaker's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerSignal {
    Success,
    Failure,
    /// Releases the permit without entering the window.
    Ignored,
}

/// Why a resilient call did not produce a value. Always handed to the
/// call site's fallback; never returned to business logic directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("transient failure: {0}")]
    Transient(TransportError),

    #[error("permanent failure: {0}")]
    Permanent(TransportError),

    #[error("circuit breaker open for target '{target}'")]
    CircuitOpen { target: String },

    #[error("rate limit exceeded for target '{target}'")]
    RateLimited { target: String },

    #[error("unknown target '{target}'")]
    UnknownTarget { target: String },
}

impl CallError {
    /// True when the call was refused without contacting the transport.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CallError::CircuitOpen { .. } | CallError::RateLimited { .. } | CallError::UnknownTarget { .. }
        )
    }

    /// Metric label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::Transient(_) => "transient",
            CallError::Permanent(_) => "permanent",
            CallError::CircuitOpen { .. } => "circuit_open",
            CallError::RateLimited { .. } => "rate_limited",
            CallError::UnknownTarget { .. } => "unknown_target",
        }
    }
}

/// Per-target mapping of transport results to outcomes.
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    transient_statuses: Vec<u16>,
}

impl FailureClassifier {
    pub fn new(transient_statuses: Vec<u16>) -> Self {
        Self { transient_statuses }
    }

    pub fn is_transient_status(&self, status: u16) -> bool {
        (500..600).contains(&status) || self.transient_statuses.contains(&status)
    }

    pub fn classify(
        &self,
        result: Result<InboundResponse, TransportError>,
    ) -> CallOutcome<InboundResponse> {
        match result {
            Ok(response) if response.status.is_success() => CallOutcome::Success(response),
            Ok(response) => self.classify_error(TransportError::Status {
                status: response.status.as_u16(),
                body: response.body_excerpt(),
            }),
            Err(e) => self.classify_error(e),
        }
    }

    pub fn classify_error<T>(&self, error: TransportError) -> CallOutcome<T> {
        let transient = match &error {
            TransportError::Timeout | TransportError::Connect(_) | TransportError::Network(_) => true,
            TransportError::Status { status, .. } => self.is_transient_status(*status),
            TransportError::Decode(_)
            | TransportError::InvalidRequest(_)
            | TransportError::Aborted(_) => false,
        };
        if transient {
            CallOutcome::TransientFailure(error)
        } else {
            CallOutcome::PermanentFailure(error)
        }
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(vec![408, 429])
    }
}
