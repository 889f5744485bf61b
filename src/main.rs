//! storefront-mesh gateway.
//!
//! Loads the target configuration, builds one target registry and serves two
//! listeners over it: the forwarding surface, where every call passes through
//! the `ResilientCaller`, and the admin surface, which reports the same
//! registry's breaker and limiter state. Services that embed the library
//! instead serve `setup_admin_router` over their own registry.
//!
//! ```text
//!   storefront services ──► gateway :8080 /{target}/{*path}
//!                                 │
//!                           ResilientCaller ──► user / product / payment ...
//!                                 │
//!            registry (limiter + breaker per target)
//!                                 │
//!   admin :8081 ◄── snapshots ────┘        Prometheus :9090
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use storefront_mesh::admin::{setup_admin_router, AdminState};
use storefront_mesh::config::{load_config, MeshConfig};
use storefront_mesh::gateway::setup_gateway_router;
use storefront_mesh::health::HealthMonitor;
use storefront_mesh::observability::{logging, metrics};
use storefront_mesh::{HttpTransport, ResilientCaller, Shutdown, TargetRegistry, Transport};

#[derive(Parser)]
#[command(name = "mesh-gateway")]
#[command(about = "Resilient call layer for storefront services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "MESH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MeshConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mesh-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(TargetRegistry::from_config(&config)?);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.timeouts));

    tracing::info!(
        targets = ?registry.names(),
        gateway_address = %config.gateway.bind_address,
        admin_address = %config.admin.bind_address,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();

    let monitor = HealthMonitor::new(registry.clone(), transport.clone(), config.health_check.clone());
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let caller = ResilientCaller::new(registry.clone(), transport);
    let gateway = setup_gateway_router(caller);
    let gateway_listener = TcpListener::bind(&config.gateway.bind_address).await?;
    tracing::info!(address = %gateway_listener.local_addr()?, "Gateway listening");

    let admin = setup_admin_router(AdminState::new(registry.clone(), &config.admin.api_key));
    let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
    tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");

    let gateway_server = axum::serve(gateway_listener, gateway)
        .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()));
    let admin_server = axum::serve(admin_listener, admin)
        .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()));
    tokio::spawn(shutdown.clone().trigger_on_signal());

    tokio::try_join!(
        async { gateway_server.await },
        async { admin_server.await },
    )?;

    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
