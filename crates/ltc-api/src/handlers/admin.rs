//! Table maintenance endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EnsureDbQuery {
    #[serde(default)]
    pub reset: Option<String>,
}

impl EnsureDbQuery {
    fn reset(&self) -> bool {
        self.reset
            .as_deref()
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

/// Create or repair the three tables; `reset=true` also clears data rows.
pub async fn ensure_db(
    State(state): State<AppState>,
    Query(query): Query<EnsureDbQuery>,
) -> ApiResult<Json<Value>> {
    let reset = query.reset();
    info!(reset, "ensure-db requested");
    let report = state.store.ensure_schema(reset).await?;
    Ok(Json(json!({
        "ok": true,
        "updated": report.updated,
        "reset": report.reset,
    })))
}

/// Data-row counts per table.
pub async fn db_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state.store.db_status().await?;
    Ok(Json(json!({
        "success": true,
        "tables": status.tables,
        "total_records": status.total_records,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_flag_parsing() {
        let query = |v: &str| EnsureDbQuery { reset: Some(v.to_string()) };
        assert!(query("true").reset());
        assert!(query("ON").reset());
        assert!(query("1").reset());
        assert!(!query("no").reset());
        assert!(!EnsureDbQuery::default().reset());
    }
}
