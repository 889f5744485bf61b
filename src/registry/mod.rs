//! Target registry.
//!
//! # Responsibilities
//! - Own one immutable `Target` (config + breaker + limiter) per dependency
//! - Build targets from configuration once, at startup
//! - Expose read-only health snapshots per target
//!
//! # Design Decisions
//! - Explicit registry injected into callers; no process-wide singletons
//! - Registration needs `&mut self`, so the map is frozen once shared via Arc
//! - Target names are unique; a duplicate registration is an error

pub mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{
    CircuitBreakerConfig, MeshConfig, RateLimitConfig, ResilienceDefaults, RetryConfig, TargetConfig,
};
use crate::resilience::{CircuitBreaker, FailureClassifier, RateLimiter};

pub use snapshot::TargetSnapshot;

/// Error building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("target '{0}' is already registered")]
    DuplicateTarget(String),

    #[error("target '{target}' has an invalid base address: {reason}")]
    InvalidAddress { target: String, reason: String },
}

/// Everything needed to register one target.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub name: String,
    pub base_address: String,
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    pub call_timeout_ms: u64,
    pub transient_statuses: Vec<u16>,
    pub record_permanent_failures: bool,
}

impl TargetSpec {
    /// A target using the stock resilience defaults.
    pub fn new(name: impl Into<String>, base_address: impl Into<String>) -> Self {
        Self::with_defaults(name, base_address, &ResilienceDefaults::default())
    }

    pub fn with_defaults(
        name: impl Into<String>,
        base_address: impl Into<String>,
        defaults: &ResilienceDefaults,
    ) -> Self {
        Self {
            name: name.into(),
            base_address: base_address.into(),
            rate_limit: defaults.rate_limit.clone(),
            circuit_breaker: defaults.circuit_breaker.clone(),
            retry: defaults.retry.clone(),
            call_timeout_ms: defaults.call_timeout_ms,
            transient_statuses: defaults.transient_statuses.clone(),
            record_permanent_failures: defaults.record_permanent_failures,
        }
    }

    /// Resolve a configured target against the `[defaults]` section.
    pub fn from_config(target: &TargetConfig, defaults: &ResilienceDefaults) -> Self {
        let mut spec = Self::with_defaults(&target.name, &target.base_address, defaults);
        if let Some(retry) = &target.retry {
            spec.retry = retry.clone();
        }
        if let Some(breaker) = &target.circuit_breaker {
            spec.circuit_breaker = breaker.clone();
        }
        if let Some(limit) = &target.rate_limit {
            spec.rate_limit = limit.clone();
        }
        if let Some(timeout) = target.call_timeout_ms {
            spec.call_timeout_ms = timeout;
        }
        if let Some(statuses) = &target.transient_statuses {
            spec.transient_statuses = statuses.clone();
        }
        if let Some(record) = target.record_permanent_failures {
            spec.record_permanent_failures = record;
        }
        spec
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    pub fn transient_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.transient_statuses = statuses;
        self
    }

    pub fn record_permanent_failures(mut self, record: bool) -> Self {
        self.record_permanent_failures = record;
        self
    }
}

/// A registered remote dependency and its resilience state.
#[derive(Debug)]
pub struct Target {
    pub name: String,
    pub base_url: Url,
    /// Default retry policy for call sites that don't override it.
    pub retry: RetryConfig,
    pub call_timeout: Option<Duration>,
    pub classifier: FailureClassifier,
    pub record_permanent_failures: bool,
    pub breaker: Arc<CircuitBreaker>,
    pub limiter: RateLimiter,
}

impl Target {
    fn from_spec(spec: TargetSpec) -> Result<Self, RegistryError> {
        let base_url = Url::parse(&spec.base_address).map_err(|e| RegistryError::InvalidAddress {
            target: spec.name.clone(),
            reason: e.to_string(),
        })?;
        if base_url.scheme() != "http" || !base_url.has_host() {
            return Err(RegistryError::InvalidAddress {
                target: spec.name,
                reason: "expected an http:// address with a host".to_string(),
            });
        }

        Ok(Self {
            breaker: Arc::new(CircuitBreaker::new(spec.name.clone(), spec.circuit_breaker)),
            limiter: RateLimiter::new(spec.rate_limit),
            classifier: FailureClassifier::new(spec.transient_statuses),
            call_timeout: (spec.call_timeout_ms > 0).then(|| Duration::from_millis(spec.call_timeout_ms)),
            record_permanent_failures: spec.record_permanent_failures,
            retry: spec.retry,
            base_url,
            name: spec.name,
        })
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot::capture(self)
    }
}

/// Name → target map shared by every caller in the process.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: HashMap<String, Arc<Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every configured target.
    pub fn from_config(config: &MeshConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for target in &config.targets {
            registry.register_target(TargetSpec::from_config(target, &config.defaults))?;
        }
        Ok(registry)
    }

    pub fn register_target(&mut self, spec: TargetSpec) -> Result<Arc<Target>, RegistryError> {
        if self.targets.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTarget(spec.name));
        }

        let target = Arc::new(Target::from_spec(spec)?);
        tracing::info!(
            target_name = %target.name,
            base_url = %target.base_url,
            max_attempts = target.retry.effective_attempts(),
            permits_per_window = target.limiter.config().permits_per_window,
            "Registered target"
        );
        self.targets.insert(target.name.clone(), target.clone());
        Ok(target)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Target>> {
        self.targets.get(name).cloned()
    }

    /// Take a rate-limit permit for `name`. Unknown targets are refused.
    pub fn try_acquire(&self, name: &str) -> bool {
        self.targets
            .get(name)
            .map(|target| target.limiter.try_acquire())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Names of all registered targets, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.targets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read-only view of every target, sorted by name.
    pub fn snapshot(&self) -> Vec<TargetSnapshot> {
        let mut snapshots: Vec<_> = self.targets.values().map(|t| t.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
