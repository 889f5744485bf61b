//! Resilient inter-service calls for the storefront mesh.
//!
//! Every outbound call to another storefront service goes through a
//! [`ResilientCaller`]: per-target rate limiting, circuit breaking, retry
//! with backoff, and a call-site fallback that either substitutes a value or
//! raises [`ServiceUnavailable`].

pub mod admin;
pub mod caller;
pub mod clients;
pub mod config;
pub mod gateway;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod transport;

pub use caller::{CallSite, Fallback, FallbackDecision, ResilientCaller, ServiceUnavailable};
pub use config::MeshConfig;
pub use lifecycle::Shutdown;
pub use registry::{TargetRegistry, TargetSpec};
pub use resilience::{CallError, CallOutcome};
pub use transport::{HttpTransport, OutboundRequest, Transport};
