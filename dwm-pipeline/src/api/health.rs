//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use dwm_common::events::WorkflowState;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("dwm-pipeline")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Short git commit hash the binary was built from
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Current workflow state
    pub workflow_state: WorkflowState,
    /// Last workflow error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
///
/// Health check endpoint for monitoring.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = dwm_common::time::elapsed_seconds(state.startup_time);

    let last_error = state.workflow.last_error().await.map(|e| e.message);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "dwm-pipeline".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        uptime_seconds,
        workflow_state: state.workflow.state().await,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
