//! Health snapshots of registered targets.

use serde::Serialize;

use crate::registry::Target;
use crate::resilience::CircuitState;

/// Read-only view of one target's resilience state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSnapshot {
    pub name: String,
    pub base_address: String,
    pub circuit_state: CircuitState,
    /// Failure rate of the breaker window, in percent.
    pub failure_rate: f64,
    pub buffered_calls: usize,
    /// `None` when rate limiting is disabled for the target.
    pub available_permits: Option<u32>,
    pub times_opened: u64,
    pub rejected_calls: u64,
}

impl TargetSnapshot {
    pub(crate) fn capture(target: &Target) -> Self {
        let breaker = target.breaker.snapshot();
        let available_permits = target
            .limiter
            .config()
            .enabled
            .then(|| target.limiter.available_permits());

        Self {
            name: target.name.clone(),
            base_address: target.base_url.to_string(),
            circuit_state: breaker.state,
            failure_rate: breaker.failure_rate,
            buffered_calls: breaker.buffered_calls,
            available_permits,
            times_opened: breaker.times_opened,
            rejected_calls: breaker.rejected_calls,
        }
    }

    pub fn is_open(&self) -> bool {
        self.circuit_state == CircuitState::Open
    }
}
