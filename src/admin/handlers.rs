use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::registry::TargetSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub targets: usize,
    pub open_circuits: Vec<String>,
}

#[derive(Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub targets: Vec<TargetSnapshot>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// 503 while any target's circuit is open.
pub async fn ready(State(state): State<AdminState>) -> (StatusCode, Json<Readiness>) {
    let targets = state.registry.snapshot();
    let ready = targets.iter().all(|t| !t.is_open());
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(Readiness { ready, targets }))
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.registry.snapshot();
    let open_circuits: Vec<String> = snapshot
        .iter()
        .filter(|t| t.is_open())
        .map(|t| t.name.clone())
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if open_circuits.is_empty() { "operational" } else { "degraded" },
        uptime_secs: state.started_at.elapsed().as_secs(),
        targets: snapshot.len(),
        open_circuits,
    })
}

pub async fn get_targets(State(state): State<AdminState>) -> Json<Vec<TargetSnapshot>> {
    Json(state.registry.snapshot())
}

pub async fn get_target(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<TargetSnapshot>, StatusCode> {
    state
        .registry
        .get(&name)
        .map(|target| Json(target.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}
