//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mesh_calls_total` (counter): attempts by target, operation, outcome
//! - `mesh_call_duration_seconds` (histogram): attempt latency by target
//! - `mesh_rejections_total` (counter): calls refused before the transport,
//!   by target and reason (`rate_limited`, `circuit_open`, `unknown_target`)
//! - `mesh_fallbacks_total` (counter): fallback decisions by target,
//!   operation and decision (`substitute`, `raise`)
//! - `mesh_circuit_state` (gauge): 0=Closed, 1=Open, 2=HalfOpen
//! - `mesh_target_up` (gauge): last health probe, 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::time::Instant;

use crate::resilience::CircuitState;

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = match PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid metrics histogram configuration");
            return;
        }
    };

    match builder.install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    describe_counter!("mesh_calls_total", "Attempts sent to targets, by outcome");
    describe_histogram!("mesh_call_duration_seconds", "Latency of attempts against targets");
    describe_counter!("mesh_rejections_total", "Calls refused before reaching the transport");
    describe_counter!("mesh_fallbacks_total", "Fallback decisions taken by call sites");
    describe_gauge!("mesh_circuit_state", "Circuit breaker state (0=closed, 1=open, 2=half_open)");
    describe_gauge!("mesh_target_up", "Result of the last health probe per target");
}

/// Record one finished attempt.
pub fn record_call(target: &str, operation: &str, outcome: &'static str, started: Instant) {
    counter!(
        "mesh_calls_total",
        "target" => target.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("mesh_call_duration_seconds", "target" => target.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rejection(target: &str, reason: &'static str) {
    counter!("mesh_rejections_total", "target" => target.to_string(), "reason" => reason).increment(1);
}

pub fn record_fallback(target: &str, operation: &str, decision: &'static str) {
    counter!(
        "mesh_fallbacks_total",
        "target" => target.to_string(),
        "operation" => operation.to_string(),
        "decision" => decision
    )
    .increment(1);
}

pub fn record_circuit_state(target: &str, state: CircuitState) {
    gauge!("mesh_circuit_state", "target" => target.to_string()).set(state.as_metric_value());
}

pub fn record_target_up(target: &str, healthy: bool) {
    gauge!("mesh_target_up", "target" => target.to_string()).set(if healthy { 1.0 } else { 0.0 });
}
