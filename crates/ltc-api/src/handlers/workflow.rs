//! Workflow status polling.

use axum::extract::{Path, State};
use axum::Json;

use ltc_models::WorkflowStatusView;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn get_workflow_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Json<WorkflowStatusView>> {
    let entry = state
        .workflows
        .get(&workflow_id)
        .await
        .ok_or_else(|| ApiError::not_found("Workflow not found"))?;
    Ok(Json(WorkflowStatusView::new(workflow_id, &entry)))
}
