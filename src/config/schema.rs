//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mesh.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a service's outbound call layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeshConfig {
    /// Forwarding listener of the gateway binary.
    pub gateway: GatewayConfig,

    /// Admin/health HTTP surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Transport-level timeouts shared by every target.
    pub timeouts: TimeoutConfig,

    /// Active health probing of targets.
    pub health_check: HealthCheckConfig,

    /// Resilience settings applied to targets that don't override them.
    pub defaults: ResilienceDefaults,

    /// Remote dependencies this service calls.
    pub targets: Vec<TargetConfig>,
}

/// Forwarding listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address serving `/{target}/{*path}`.
    pub bind_address: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Admin dashboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin/health bind address.
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8081".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Timeout configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Request timeout (total time for request/response) in milliseconds.
    pub request_ms: u64,

    /// Maximum response body size buffered from a target.
    pub max_body_bytes: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            request_ms: 10_000,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable periodic health probes of every target.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Path to probe on every target.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
            path: "/health".to_string(),
        }
    }
}

/// Resilience settings inherited by every target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceDefaults {
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub rate_limit: RateLimitConfig,

    /// How long a caller waits for one attempt before abandoning it (0 = no limit).
    pub call_timeout_ms: u64,

    /// Status codes treated as transient in addition to 5xx.
    pub transient_statuses: Vec<u16>,

    /// Count permanent failures (4xx, malformed responses) toward the breaker's failure ratio.
    pub record_permanent_failures: bool,
}

impl Default for ResilienceDefaults {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            call_timeout_ms: 0,
            transient_statuses: vec![408, 429],
            record_permanent_failures: true,
        }
    }
}

/// A remote dependency. Unset sections fall back to [`ResilienceDefaults`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Logical name (e.g., "user-service"); must be unique.
    pub name: String,

    /// Base address (e.g., "http://user-service:8080").
    pub base_address: String,

    #[serde(default)]
    pub retry: Option<RetryConfig>,

    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(default)]
    pub call_timeout_ms: Option<u64>,

    #[serde(default)]
    pub transient_statuses: Option<Vec<u16>>,

    #[serde(default)]
    pub record_permanent_failures: Option<bool>,
}

impl TargetConfig {
    /// A target with no overrides.
    pub fn new(name: impl Into<String>, base_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_address: base_address.into(),
            retry: None,
            circuit_breaker: None,
            rate_limit: None,
            call_timeout_ms: None,
            transient_statuses: None,
            record_permanent_failures: None,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries. When disabled every call makes exactly one attempt.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Attempts a call is allowed to make under this config.
    pub fn effective_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes kept in the sliding window.
    pub window_size: usize,

    /// Samples required in the window before the failure ratio is evaluated.
    pub minimum_calls: usize,

    /// Failure ratio, in percent, at or above which the circuit opens.
    pub failure_rate_threshold: f64,

    /// Time spent Open before trial calls are let through.
    pub cool_down_ms: u64,

    /// Trial calls allowed in flight while HalfOpen.
    pub half_open_max_calls: usize,
}

impl CircuitBreakerConfig {
    pub fn cool_down(&self) -> Duration {
        Duration::from_millis(self.cool_down_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 5,
            failure_rate_threshold: 50.0,
            cool_down_ms: 30_000,
            half_open_max_calls: 1,
        }
    }
}

/// Outbound rate limiting configuration (fixed window).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Calls admitted per window.
    pub permits_per_window: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permits_per_window: 100,
            window_ms: 1_000,
        }
    }
}
