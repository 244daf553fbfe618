//! Workflow API handlers
//!
//! POST /workflow/file, /workflow/upload, /workflow/submit, /workflow/reset;
//! GET /workflow, /workflow/poll-log
//!
//! Every mutating handler answers with the resulting snapshot. Failures are
//! mapped by `ApiError` and are also visible afterwards as `lastError` in
//! GET /workflow.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    models::{Operation, PollLogEntry},
    services::SubmitParams,
    workflow::WorkflowSnapshot,
    AppState,
};

/// POST /workflow/file query
#[derive(Debug, Deserialize)]
pub struct SelectFileQuery {
    pub name: String,
}

/// POST /workflow/submit request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub operation: Operation,
    #[serde(flatten)]
    pub params: SubmitParams,
}

/// POST /workflow/file?name=<file name>
///
/// Raw request body is the file content.
pub async fn select_file(
    State(state): State<AppState>,
    Query(query): Query<SelectFileQuery>,
    body: Bytes,
) -> ApiResult<Json<WorkflowSnapshot>> {
    if query.name.trim().is_empty() {
        return Err(ApiError::BadRequest("File name must not be empty".to_string()));
    }

    state.workflow.select(query.name, body.to_vec()).await?;
    Ok(Json(state.workflow.snapshot().await))
}

/// POST /workflow/upload
///
/// Resolves when the transport does; progress is streamed on /events.
pub async fn upload(State(state): State<AppState>) -> ApiResult<Json<WorkflowSnapshot>> {
    state.workflow.upload().await?;
    Ok(Json(state.workflow.snapshot().await))
}

/// POST /workflow/submit
///
/// Returns once the backend accepted the job; polling continues in the
/// background.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<Json<WorkflowSnapshot>> {
    state
        .workflow
        .submit(request.operation, request.params)
        .await?;
    Ok(Json(state.workflow.snapshot().await))
}

/// POST /workflow/reset
pub async fn reset(State(state): State<AppState>) -> Json<WorkflowSnapshot> {
    state.workflow.reset().await;
    Json(state.workflow.snapshot().await)
}

/// GET /workflow
pub async fn get_workflow(State(state): State<AppState>) -> Json<WorkflowSnapshot> {
    Json(state.workflow.snapshot().await)
}

/// GET /workflow/poll-log
pub async fn get_poll_log(State(state): State<AppState>) -> Json<Vec<PollLogEntry>> {
    Json(state.workflow.poll_log().await)
}

/// Build workflow routes
pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflow", get(get_workflow))
        .route("/workflow/poll-log", get(get_poll_log))
        .route("/workflow/file", post(select_file))
        .route("/workflow/upload", post(upload))
        .route("/workflow/submit", post(submit))
        .route("/workflow/reset", post(reset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_flattens_params() {
        let request: SubmitRequest = serde_json::from_str(
            r#"{"operation":"embed","policyId":"p1","watermarkText":"CONFIDENTIAL"}"#,
        )
        .unwrap();
        assert_eq!(request.operation, Operation::Embed);
        assert_eq!(request.params, SubmitParams::embed("p1", "CONFIDENTIAL"));

        let request: SubmitRequest = serde_json::from_str(r#"{"operation":"extract"}"#).unwrap();
        assert_eq!(request.params, SubmitParams::extract());
    }
}
