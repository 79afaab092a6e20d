//! Webhook intake: validate, register a workflow and run it in the background.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn, Instrument};

use ltc_models::WebhookPayload;
use ltc_pipeline::WEBHOOK_SECRET_HEADER;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    /// Secret for manual calls that cannot set headers.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Accept a learning-to-content request and answer 202 with a status URL.
///
/// Shape and mode-specific fields are checked here; authentication and all
/// pipeline work happen in the background task, whose outcome is published
/// through the workflow registry.
pub async fn learning_to_content(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let raw: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?
    };
    let payload = WebhookPayload::from_value(&raw).map_err(ApiError::bad_request)?;
    payload.validate().map_err(ApiError::bad_request)?;

    let mut forwarded: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    if !forwarded.contains_key(WEBHOOK_SECRET_HEADER) {
        if let Some(secret) = query.webhook_secret.filter(|s| !s.is_empty()) {
            forwarded.insert(WEBHOOK_SECRET_HEADER.to_string(), secret);
        }
    }

    let workflow_id = state.workflows.start().await;
    let preview = payload.input_preview();
    let mode = payload.input_mode();
    metrics::record_workflow_accepted(mode.as_str());
    info!(workflow_id = %workflow_id, mode = mode.as_str(), preview = %preview, "Workflow accepted");

    let coordinator = state.coordinator.clone();
    let workflows = state.workflows.clone();
    let task_id = workflow_id.clone();
    let span = tracing::info_span!("workflow", workflow_id = %workflow_id);
    tokio::spawn(
        async move {
            let run_id = task_id.clone();
            let run = tokio::spawn(async move {
                coordinator
                    .process_request(&forwarded, &raw, Some(&run_id))
                    .await
            });
            match run.await {
                Ok((response, status_code)) => workflows.finish(&task_id, response, status_code).await,
                Err(e) => {
                    warn!("Workflow task aborted: {}", e);
                    workflows.fail(&task_id, &format!("Workflow task aborted: {}", e)).await;
                }
            }
        }
        .instrument(span),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "Workflow started successfully",
            "workflow_id": workflow_id,
            "input_preview": preview,
            "language": payload.language(),
            "tone": payload.tone(),
            "voice_gender": payload.voice_gender(),
            "platforms": payload.platforms_or_default(),
            "status_url": format!("/api/workflow/status/{}", workflow_id),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    ))
}
