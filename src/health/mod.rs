//! Active health probing of targets.
//!
//! # Data Flow
//! ```text
//! Periodic timer
//!     → GET <health_check.path> on every registered target
//!     → classify with the target's failure classifier
//!     → log + `mesh_target_up` gauge
//! ```
//!
//! # Design Decisions
//! - Probes go straight to the transport: they never consume rate-limit
//!   permits and never enter a breaker window
//! - Breaker state stays driven by real traffic only
//! - Disabled by default

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::registry::TargetRegistry;
use crate::resilience::CallOutcome;
use crate::transport::{OutboundRequest, Transport};

/// Result of probing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: String,
    pub healthy: bool,
}

pub struct HealthMonitor {
    registry: Arc<TargetRegistry>,
    transport: Arc<dyn Transport>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<TargetRegistry>,
        transport: Arc<dyn Transport>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            targets = self.registry.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every registered target once, in name order.
    pub async fn probe_all(&self) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.registry.len());

        for name in self.registry.names() {
            let Some(target) = self.registry.get(&name) else {
                continue;
            };

            let request = OutboundRequest::get(self.config.path.clone());
            let outcome = target
                .classifier
                .classify(self.transport.send(&target.base_url, request).await);

            let healthy = match outcome {
                CallOutcome::Success(_) => true,
                CallOutcome::TransientFailure(e) | CallOutcome::PermanentFailure(e) => {
                    tracing::warn!(target_name = %name, error = %e, "Health probe failed");
                    false
                }
            };

            metrics::record_target_up(&name, healthy);
            results.push(ProbeResult { target: name, healthy });
        }

        results
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
