//! In-process workflow handles polled by the status endpoint.
//!
//! Entries live only for the process lifetime. Finished entries expire after
//! the retention window and the map never holds more than `max_entries`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ltc_models::workflow::new_workflow_id;
use ltc_models::WorkflowEntry;
use ltc_pipeline::StatusNotifier;

use crate::metrics;

pub struct WorkflowRegistry {
    entries: RwLock<HashMap<String, WorkflowEntry>>,
    retention: Duration,
    max_entries: usize,
}

impl WorkflowRegistry {
    pub fn new(retention: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
            max_entries: max_entries.max(1),
        }
    }

    /// Register a new `Processing` workflow and return its id.
    ///
    /// Ids are `workflow_{unix}_{suffix}` so two requests in the same second
    /// never share a handle.
    pub async fn start(&self) -> String {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        self.prune(&mut entries, now);

        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("{}_{}", new_workflow_id(now), &suffix[..8]);

        entries.insert(id.clone(), WorkflowEntry::processing(now));
        metrics::set_workflows_tracked(entries.len());
        info!(workflow_id = %id, "Workflow registered");
        id
    }

    pub async fn get(&self, workflow_id: &str) -> Option<WorkflowEntry> {
        self.entries.read().await.get(workflow_id).cloned()
    }

    pub async fn set_status(&self, workflow_id: &str, status: &str) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(workflow_id) {
            Some(entry) => {
                entry.set_status(status, Utc::now());
                info!(workflow_id = %workflow_id, status = %status, "Workflow status updated");
            }
            None => debug!(workflow_id = %workflow_id, "Status for unknown workflow ignored"),
        }
    }

    /// Record the coordinator's response for a finished run.
    pub async fn finish(&self, workflow_id: &str, response: Value, status_code: u16) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(workflow_id) {
            entry.finish(response, status_code, Utc::now());
            metrics::record_workflow_finished(&entry.status);
            info!(workflow_id = %workflow_id, status_code, "Workflow finished");
        }
    }

    /// Mark a run that ended without a response.
    pub async fn fail(&self, workflow_id: &str, error: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(workflow_id) {
            entry.fail(error, Utc::now());
            metrics::record_workflow_finished(&entry.status);
            warn!(workflow_id = %workflow_id, "Workflow failed: {}", error);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop expired finished entries, then the oldest ones while at capacity.
    fn prune(&self, entries: &mut HashMap<String, WorkflowEntry>, now: DateTime<Utc>) {
        let retention = chrono::Duration::from_std(self.retention).unwrap_or_else(|_| chrono::Duration::days(365));
        entries.retain(|_, entry| match entry.completed_at {
            Some(done) => now.signed_duration_since(done) < retention,
            None => true,
        });

        if entries.len() >= self.max_entries {
            let mut by_age: Vec<(String, bool, DateTime<Utc>)> = entries
                .iter()
                .map(|(id, e)| (id.clone(), e.is_finished(), e.started_at))
                .collect();
            // Finished workflows go first, oldest first within each group
            by_age.sort_by_key(|(_, finished, started)| (!*finished, *started));

            let to_remove = entries.len() + 1 - self.max_entries;
            for (id, _, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&id);
            }
            warn!("Workflow registry at capacity, removed {} entries", to_remove);
        }
    }
}

#[async_trait]
impl StatusNotifier for WorkflowRegistry {
    async fn notify(&self, workflow_id: &str, status: &str) {
        self.set_status(workflow_id, status).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lifecycle() {
        let registry = WorkflowRegistry::new(Duration::from_secs(60), 10);
        let id = registry.start().await;
        assert!(id.starts_with("workflow_"));
        assert_eq!(registry.get(&id).await.unwrap().status, "Processing");

        registry.notify(&id, "Script Generated").await;
        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.status, "Script Generated");
        assert!(entry.updated_at.is_some());
        assert!(!entry.is_finished());

        registry.finish(&id, json!({"ok": true}), 200).await;
        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.status, "Completed");
        assert!(entry.is_finished());
    }

    #[tokio::test]
    async fn test_non_200_response_fails_with_error() {
        let registry = WorkflowRegistry::new(Duration::from_secs(60), 10);
        let id = registry.start().await;
        registry
            .finish(&id, json!({"ok": false, "error": "Unauthorized - Invalid webhook secret"}), 401)
            .await;

        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.status, "Failed");
        assert_eq!(entry.error.as_deref(), Some("Unauthorized - Invalid webhook secret"));
    }

    #[tokio::test]
    async fn test_same_second_ids_are_distinct() {
        let registry = WorkflowRegistry::new(Duration::from_secs(60), 10);
        let a = registry.start().await;
        let b = registry.start().await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_finished_before_running() {
        let registry = WorkflowRegistry::new(Duration::from_secs(3600), 2);
        let done = registry.start().await;
        registry.finish(&done, json!({"ok": true}), 200).await;
        let running = registry.start().await;

        let newest = registry.start().await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.get(&done).await.is_none());
        assert!(registry.get(&running).await.is_some());
        assert!(registry.get(&newest).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_finished_entries_pruned() {
        let registry = WorkflowRegistry::new(Duration::ZERO, 10);
        let id = registry.start().await;
        registry.fail(&id, "boom").await;
        assert_eq!(registry.get(&id).await.unwrap().status, "Failed");

        registry.start().await;
        assert!(registry.get(&id).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_workflow_status_ignored() {
        let registry = WorkflowRegistry::new(Duration::from_secs(60), 10);
        registry.notify("workflow_missing", "Completed").await;
        assert!(registry.is_empty().await);
    }
}
