//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilient calls produce:
//!     → logging.rs (structured log events: retries, transitions, fallbacks)
//!     → metrics.rs (attempt counters, latency, rejections, breaker state)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields (`target_name`, `operation`, `attempt`) on every event
//! - The request id travels in the `x-request-id` header of each attempt
//! - Metrics are cheap facade calls; no recorder means no cost

pub mod logging;
pub mod metrics;
