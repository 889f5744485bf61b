//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check target names are present and unique
//! - Validate value ranges (attempts > 0, thresholds in range, windows > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MeshConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{CircuitBreakerConfig, MeshConfig, RateLimitConfig, RetryConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("target #{index} has an empty name")]
    EmptyTargetName { index: usize },

    #[error("target '{0}' is declared more than once")]
    DuplicateTarget(String),

    #[error("target '{target}' has an invalid base address '{address}'")]
    InvalidBaseAddress { target: String, address: String },

    #[error("{scope}: {reason}")]
    InvalidValue { scope: String, reason: String },
}

fn invalid(scope: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason: reason.into(),
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MeshConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateway.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid("gateway.bind_address", "must be a socket address"));
    }
    if config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid("admin.bind_address", "must be a socket address"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(invalid("observability.metrics_address", "must be a socket address"));
    }
    if config.timeouts.request_ms == 0 {
        errors.push(invalid("timeouts.request_ms", "must be greater than zero"));
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(invalid("health_check.interval_secs", "must be greater than zero"));
    }

    check_retry("defaults.retry", &config.defaults.retry, &mut errors);
    check_breaker("defaults.circuit_breaker", &config.defaults.circuit_breaker, &mut errors);
    check_rate_limit("defaults.rate_limit", &config.defaults.rate_limit, &mut errors);

    let mut seen = HashSet::new();
    for (index, target) in config.targets.iter().enumerate() {
        if target.name.trim().is_empty() {
            errors.push(ValidationError::EmptyTargetName { index });
            continue;
        }
        if !seen.insert(target.name.as_str()) {
            errors.push(ValidationError::DuplicateTarget(target.name.clone()));
        }

        let base_ok = Url::parse(&target.base_address)
            .map(|url| url.scheme() == "http" && url.has_host())
            .unwrap_or(false);
        if !base_ok {
            errors.push(ValidationError::InvalidBaseAddress {
                target: target.name.clone(),
                address: target.base_address.clone(),
            });
        }

        if let Some(retry) = &target.retry {
            check_retry(&format!("targets.{}.retry", target.name), retry, &mut errors);
        }
        if let Some(breaker) = &target.circuit_breaker {
            check_breaker(&format!("targets.{}.circuit_breaker", target.name), breaker, &mut errors);
        }
        if let Some(limit) = &target.rate_limit {
            check_rate_limit(&format!("targets.{}.rate_limit", target.name), limit, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry(scope: &str, retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts == 0 {
        errors.push(invalid(scope, "max_attempts must be at least 1"));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(invalid(scope, "base_delay_ms must not exceed max_delay_ms"));
    }
}

fn check_breaker(scope: &str, breaker: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if breaker.window_size == 0 {
        errors.push(invalid(scope, "window_size must be at least 1"));
    }
    if breaker.minimum_calls == 0 || breaker.minimum_calls > breaker.window_size {
        errors.push(invalid(scope, "minimum_calls must be between 1 and window_size"));
    }
    if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 100.0) {
        errors.push(invalid(scope, "failure_rate_threshold must be in (0, 100]"));
    }
    if breaker.half_open_max_calls == 0 {
        errors.push(invalid(scope, "half_open_max_calls must be at least 1"));
    }
}

fn check_rate_limit(scope: &str, limit: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
    if !limit.enabled {
        return;
    }
    if limit.permits_per_window == 0 {
        errors.push(invalid(scope, "permits_per_window must be at least 1"));
    }
    if limit.window_ms == 0 {
        errors.push(invalid(scope, "window_ms must be greater than zero"));
    }
}
