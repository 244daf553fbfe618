//! Policy listing for the embed selector

use axum::{extract::State, routing::get, Json, Router};

use crate::{error::ApiResult, models::Policy, AppState};

/// GET /policies
///
/// Active policies from the policy store, passed through unchanged.
pub async fn list_policies(State(state): State<AppState>) -> ApiResult<Json<Vec<Policy>>> {
    let policies = state.workflow.policies().await?;
    tracing::debug!(count = policies.len(), "Listed active policies");
    Ok(Json(policies))
}

pub fn policy_routes() -> Router<AppState> {
    Router::new().route("/policies", get(list_policies))
}
