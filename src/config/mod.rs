//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MeshConfig (validated, immutable)
//!     → TargetRegistry::from_config (per-target state built once)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; target state is built from it at startup
//! - All fields have defaults to allow minimal configs
//! - Per-target sections override `[defaults]` wholesale, section by section
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, GatewayConfig, HealthCheckConfig, MeshConfig, ObservabilityConfig,
    RateLimitConfig, ResilienceDefaults, RetryConfig, TargetConfig, TimeoutConfig,
};
pub use validation::ValidationError;
