//! Caller-side attempt deadlines.
//!
//! # Responsibilities
//! - Run each attempt as its own task that owns the breaker permit
//! - Let the caller stop waiting after `call_timeout_ms`
//! - Keep the abandoned attempt running so its real outcome still reaches
//!   the breaker
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An abandoned attempt is a transient `Timeout` for the caller only; the
//!   breaker records whatever the transport eventually returns
//! - A panicking attempt is a permanent `Aborted` failure; its permit is
//!   released by drop

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::resilience::outcome::CallOutcome;
use crate::transport::TransportError;

/// Spawn `attempt` and wait for it at most `limit`.
pub async fn run_detached<T, Fut>(attempt: Fut, limit: Option<Duration>) -> CallOutcome<T>
where
    T: Send + 'static,
    Fut: Future<Output = CallOutcome<T>> + Send + 'static,
{
    let handle = tokio::spawn(attempt);

    let joined = match limit {
        Some(limit) => match time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(timeout = ?limit, "Caller stopped waiting for attempt; outcome will still be recorded");
                return CallOutcome::TransientFailure(TransportError::Timeout);
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Attempt task failed");
            CallOutcome::PermanentFailure(TransportError::Aborted(e.to_string()))
        }
    }
}
