//! Admin and health HTTP surface.
//!
//! # Routes
//! ```text
//! GET /health               liveness, always 200
//! GET /ready                200, or 503 while any circuit is open
//! GET /admin/status         version, uptime, open circuits   (bearer auth)
//! GET /admin/targets        snapshot of every target         (bearer auth)
//! GET /admin/targets/{name} snapshot of one target           (bearer auth)
//! ```

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::registry::TargetRegistry;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Debug, Clone)]
pub struct AdminState {
    pub registry: Arc<TargetRegistry>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(registry: Arc<TargetRegistry>, api_key: &str) -> Self {
        Self {
            registry,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    let protected = Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/targets", get(get_targets))
        .route("/admin/targets/{name}", get(get_target))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
