//! Retry logic.
//!
//! # Responsibilities
//! - Re-invoke an operation on transient failures, up to `max_attempts`
//! - Sleep an exponential, jittered backoff between attempts
//! - Consult a gate (the target's circuit breaker) before every attempt
//!
//! # Design Decisions
//! - Permanent failures are never retried
//! - The gate is checked before each attempt, not only the first, so a
//!   breaker that opens mid-retry stops the loop
//! - Exhaustion surfaces the last transient failure

use std::future::Future;
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::{CallPermit, CircuitBreaker};
use crate::resilience::outcome::{CallError, CallOutcome};

/// Admission check run before every attempt.
pub trait AttemptGate {
    /// Token handed to the attempt it admitted.
    type Permit: Send + 'static;

    fn admit(&self) -> Result<Self::Permit, CallError>;
}

/// A gate that admits every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ungated;

impl AttemptGate for Ungated {
    type Permit = ();

    fn admit(&self) -> Result<(), CallError> {
        Ok(())
    }
}

impl AttemptGate for Arc<CircuitBreaker> {
    type Permit = CallPermit;

    fn admit(&self) -> Result<CallPermit, CallError> {
        self.try_acquire()
    }
}

/// Run `operation` under `policy`, consulting `gate` before each attempt.
///
/// The operation receives the 1-based attempt number and the gate's permit.
pub async fn execute_with_retry<G, T, F, Fut>(
    policy: &RetryConfig,
    gate: &G,
    mut operation: F,
) -> Result<T, CallError>
where
    G: AttemptGate,
    F: FnMut(u32, G::Permit) -> Fut,
    Fut: Future<Output = CallOutcome<T>>,
{
    let max_attempts = policy.effective_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let permit = gate.admit()?;

        match operation(attempt, permit).await {
            CallOutcome::Success(value) => return Ok(value),
            CallOutcome::PermanentFailure(e) => return Err(CallError::Permanent(e)),
            CallOutcome::TransientFailure(e) => {
                if attempt >= max_attempts {
                    return Err(CallError::Transient(e));
                }
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::info!(attempt, max_attempts, delay = ?delay, error = %e, "Retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// [`execute_with_retry`] without a gate.
pub async fn execute_ungated<T, F, Fut>(policy: &RetryConfig, mut operation: F) -> Result<T, CallError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = CallOutcome<T>>,
{
    execute_with_retry(policy, &Ungated, |attempt, ()| operation(attempt)).await
}
