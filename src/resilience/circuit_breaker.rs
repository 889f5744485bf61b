//! Circuit breaker for target protection.
//!
//! # States
//! - Closed: normal operation, calls pass through, outcomes enter a sliding window
//! - Open: target assumed down, calls fail fast without touching the transport
//! - Half-Open: a limited number of trial calls test whether the target recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= minimum_calls and failure rate >= threshold
//! Open → Half-Open: first acquisition or state read after cool_down has elapsed
//! Half-Open → Closed: a trial call succeeds (window cleared)
//! Half-Open → Open: a trial call fails (cool-down restarts)
//! ```
//!
//! # Design Decisions
//! - Per-target circuit breaker (not global), owned by the registry
//! - Count-based window of the last `window_size` outcomes
//! - Acquisition hands out a `CallPermit`; the permit records the outcome
//! - Every transition bumps a generation; permits from an older generation
//!   are ignored, so a window trips exactly once and late outcomes from calls
//!   admitted before a trip can't reopen or close the circuit

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::outcome::{BreakerSignal, CallError};

/// Circuit breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge value (0=Closed, 1=Open, 2=HalfOpen).
    pub fn as_metric_value(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Sliding window of recent outcomes (`true` = failure).
#[derive(Debug, Default)]
struct OutcomeWindow {
    outcomes: VecDeque<bool>,
    failures: usize,
}

impl OutcomeWindow {
    fn push(&mut self, failed: bool, capacity: usize) {
        if self.outcomes.len() == capacity {
            if let Some(true) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }

    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failures as f64 * 100.0 / self.outcomes.len() as f64
        }
    }

    fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    generation: u64,
    window: OutcomeWindow,
    opened_at: Option<Instant>,
    half_open_in_flight: usize,
}

/// Point-in-time view of a breaker, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    /// Failure rate of the current window, in percent.
    pub failure_rate: f64,
    pub buffered_calls: usize,
    pub times_opened: u64,
    pub rejected_calls: u64,
}

/// Per-target circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    target: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    times_opened: AtomicU64,
    rejected: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(target: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            target: target.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                generation: 0,
                window: OutcomeWindow::default(),
                opened_at: None,
                half_open_in_flight: 0,
            }),
            times_opened: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    // A panic while holding the lock can't leave the window half-updated in a
    // way later calls can't tolerate, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An Open circuit whose cool-down has elapsed is moved
    /// to HalfOpen here, so readers never see a stale Open.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.expire_cool_down(&mut inner);
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        self.expire_cool_down(&mut inner);
        BreakerSnapshot {
            state: inner.state,
            failure_rate: inner.window.failure_rate(),
            buffered_calls: inner.window.len(),
            times_opened: self.times_opened.load(Ordering::Relaxed),
            rejected_calls: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Ask to place one call. Fails fast with `CallError::CircuitOpen`.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, CallError> {
        let mut inner = self.lock();
        self.expire_cool_down(&mut inner);

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_calls {
                    inner.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !admitted {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target_name = %self.target, state = ?inner.state, "Circuit breaker rejected call");
            return Err(CallError::CircuitOpen {
                target: self.target.clone(),
            });
        }

        Ok(CallPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            recorded: false,
        })
    }

    fn expire_cool_down(&self, inner: &mut BreakerInner) {
        if inner.state != CircuitState::Open {
            return;
        }
        let cooled = inner
            .opened_at
            .map(|opened| opened.elapsed() >= self.config.cool_down())
            .unwrap_or(true);
        if cooled {
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    fn on_outcome(&self, generation: u64, signal: BreakerSignal) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                if signal == BreakerSignal::Ignored {
                    return;
                }
                let failed = signal == BreakerSignal::Failure;
                inner.window.push(failed, self.config.window_size);
                if failed
                    && inner.window.len() >= self.config.minimum_calls
                    && inner.window.failure_rate() >= self.config.failure_rate_threshold
                {
                    tracing::warn!(
                        target_name = %self.target,
                        failure_rate = inner.window.failure_rate(),
                        buffered_calls = inner.window.len(),
                        threshold = self.config.failure_rate_threshold,
                        "Circuit breaker transitioning CLOSED -> OPEN"
                    );
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                match signal {
                    BreakerSignal::Success => {
                        tracing::info!(target_name = %self.target, "Circuit breaker transitioning HALF_OPEN -> CLOSED");
                        self.transition(&mut inner, CircuitState::Closed);
                    }
                    BreakerSignal::Failure => {
                        tracing::warn!(target_name = %self.target, "Circuit breaker transitioning HALF_OPEN -> OPEN: trial call failed");
                        self.transition(&mut inner, CircuitState::Open);
                    }
                    BreakerSignal::Ignored => {}
                }
            }
            // Permits are never issued while Open.
            CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        inner.state = to;
        inner.generation += 1;
        inner.half_open_in_flight = 0;
        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.window.clear();
                self.times_opened.fetch_add(1, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                tracing::info!(target_name = %self.target, "Circuit breaker transitioning OPEN -> HALF_OPEN");
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
            }
        }
        metrics::record_circuit_state(&self.target, to);
    }
}

/// Admission token for one attempt. Consumed by [`CallPermit::record`];
/// dropping it unrecorded frees its half-open trial slot.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    recorded: bool,
}

impl CallPermit {
    pub fn record(mut self, signal: BreakerSignal) {
        self.recorded = true;
        self.breaker.on_outcome(self.generation, signal);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.release(self.generation);
        }
    }
}
