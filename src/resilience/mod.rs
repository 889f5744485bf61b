//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a target:
//!     → rate_limiter.rs (fixed-window permit, reject immediately when exhausted)
//!     → circuit_breaker.rs (fail fast while Open)
//!     → retries.rs (re-check breaker, attempt, backoff.rs between attempts)
//!         → timeouts.rs (attempt runs detached; caller waits up to its deadline)
//!         → outcome.rs (classify as success / transient / permanent)
//!     → breaker records the attempt outcome
//! ```
//!
//! # Design Decisions
//! - Limiter and breaker state are per target and the only shared mutable state
//! - Checks are synchronous critical sections; only the transport awaits
//! - Outcomes are tagged values, not errors crossing layers

pub mod backoff;
pub mod circuit_breaker;
pub mod outcome;
pub mod rate_limiter;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitState};
pub use outcome::{BreakerSignal, CallError, CallOutcome, FailureClassifier};
pub use rate_limiter::RateLimiter;
pub use retries::{execute_ungated, execute_with_retry, AttemptGate, Ungated};
