//! Run definitions: one inbound request's batch of topics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::request::WebhookPayload;

/// Unique identifier for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups the topics created from a single request.
///
/// Immutable once created. Completion is derived from the topics' statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    /// Time-based identifier (`run_{unix}`).
    pub topic_run_id: String,
    pub started_at: DateTime<Utc>,
    /// Workflow handle this run reports to, if any.
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub payload: WebhookPayload,
}

impl Run {
    /// Start a new run for `payload`.
    pub fn start(payload: WebhookPayload, workflow_id: Option<&str>) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: RunId::new(),
            topic_run_id: format!("run_{}", started_at.timestamp()),
            started_at,
            workflow_id: workflow_id.map(str::to_string),
            payload,
        }
    }

    /// Unix seconds of the run start, used to derive topic IDs.
    pub fn unix_start(&self) -> i64 {
        self.started_at.timestamp()
    }
}
