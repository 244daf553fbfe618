//! dwm-pipeline library interface
//!
//! Document watermark pipeline: file intake, simulated upload progress, job
//! submission and status polling behind one workflow state machine, served
//! over HTTP + SSE.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod event_bridge;
pub mod models;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};
pub use crate::workflow::{Collaborators, Workflow, WorkflowSnapshot};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use dwm_common::config::PipelineConfig;
use dwm_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Headroom over the intake limit so oversize files reach validation
const BODY_LIMIT_SLACK_BYTES: usize = 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The workflow instance this service hosts
    pub workflow: Arc<Workflow>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub config: Arc<PipelineConfig>,
}

impl AppState {
    pub fn new(config: PipelineConfig, collaborators: Collaborators, event_bus: EventBus) -> Self {
        let workflow = Workflow::new(&config, collaborators, event_bus.clone());
        Self {
            workflow: Arc::new(workflow),
            event_bus,
            startup_time: Utc::now(),
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = usize::try_from(state.config.intake.max_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK_BYTES);

    Router::new()
        .merge(api::workflow_routes())
        .merge(api::policy_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
