//! Workflow handle types exposed to status polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Initial status of a freshly accepted workflow.
pub const STATUS_PROCESSING: &str = "Processing";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_FAILED: &str = "Failed";

/// Run-level status strings reported before any topic starts.
pub const STATUS_EXTRACTING_TOPICS: &str = "Extracting Topics";
pub const STATUS_TOPICS_EXTRACTED: &str = "Topics Extracted";

/// Generate a workflow identifier.
pub fn new_workflow_id(now: DateTime<Utc>) -> String {
    format!("workflow_{}", now.timestamp())
}

/// In-memory correlation record for one accepted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEntry {
    pub status: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowEntry {
    pub fn processing(now: DateTime<Utc>) -> Self {
        Self {
            status: STATUS_PROCESSING.to_string(),
            started_at: now,
            updated_at: None,
            completed_at: None,
            response: None,
            status_code: None,
            error: None,
        }
    }

    /// Whether the background task has finished.
    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn set_status(&mut self, status: impl Into<String>, now: DateTime<Utc>) {
        self.status = status.into();
        self.updated_at = Some(now);
    }

    /// Record the coordinator's final response.
    ///
    /// A 200 response completes the workflow; anything else fails it and
    /// surfaces the response's `error` field.
    pub fn finish(&mut self, response: Value, status_code: u16, now: DateTime<Utc>) {
        if status_code == 200 {
            self.status = STATUS_COMPLETED.to_string();
            self.error = None;
        } else {
            self.status = STATUS_FAILED.to_string();
            self.error = response
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        self.response = Some(response);
        self.status_code = Some(status_code);
        self.completed_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Mark failed without a response body.
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = STATUS_FAILED.to_string();
        self.error = Some(error.into());
        self.completed_at = Some(now);
        self.updated_at = Some(now);
    }
}

/// Body returned by the status polling endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusView {
    pub workflow_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl WorkflowStatusView {
    pub fn new(workflow_id: impl Into<String>, entry: &WorkflowEntry) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            status: entry.status.clone(),
            started_at: entry.started_at,
            updated_at: entry.updated_at,
            completed_at: entry.completed_at,
            response: entry.response.clone(),
            error: entry.error.clone(),
        }
    }
}
