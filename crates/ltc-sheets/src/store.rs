//! Topic rows and the two append-only logs on top of a [`TableBackend`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use ltc_models::sheet::{
    api_usage_row, columns, error_row, new_topic_row, snapshot_cells, API_USAGE, ERROR_LOG,
    ESSENTIAL_CONTENT, TABLES,
};
use ltc_models::Topic;

use crate::backend::TableBackend;
use crate::error::SheetsResult;
use crate::metrics::record_row_fallback;

/// Result of [`TopicStore::ensure_schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Tables that were created, re-headed or cleared.
    pub updated: Vec<String>,
    pub reset: bool,
}

/// Data-row counts per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStatus {
    pub tables: BTreeMap<String, usize>,
    pub total_records: usize,
}

#[derive(Clone)]
pub struct TopicStore {
    backend: Arc<dyn TableBackend>,
}

impl TopicStore {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn TableBackend> {
        &self.backend
    }

    /// Append one pending row per topic.
    pub async fn insert_topics(&self, topics: &[Topic]) -> SheetsResult<()> {
        let rows: Vec<Vec<String>> = topics.iter().map(new_topic_row).collect();
        self.backend.append_rows(ESSENTIAL_CONTENT, rows).await?;
        info!(count = topics.len(), "Inserted topic rows");
        Ok(())
    }

    /// Write the topic's snapshot cells into its row.
    ///
    /// When the row cannot be found the cells go to the append position.
    /// Concurrent runs may race here; the last writer wins.
    pub async fn update_topic(&self, topic: &Topic) -> SheetsResult<usize> {
        let topic_id = topic.topic_id.as_str();
        let row = match self
            .backend
            .find_row_by_key(ESSENTIAL_CONTENT, columns::TOPIC_ID, topic_id)
            .await?
        {
            Some(row) => row,
            None => {
                let row = (self.backend.read_all(ESSENTIAL_CONTENT).await?.len() + 1).max(2);
                warn!(topic_id = %topic_id, row, "Topic row not found, writing at append position");
                record_row_fallback();
                self.backend
                    .update_cell(ESSENTIAL_CONTENT, row, columns::TOPIC_ID, topic_id)
                    .await?;
                row
            }
        };

        self.backend
            .update_cells(ESSENTIAL_CONTENT, row, &snapshot_cells(topic))
            .await?;
        debug!(topic_id = %topic_id, row, status = topic.status.as_str(), "Persisted topic snapshot");
        Ok(row)
    }

    pub async fn log_api_usage(
        &self,
        run_id: &str,
        topic_id: &str,
        provider: &str,
        status_code: u16,
        tokens: u64,
    ) -> SheetsResult<()> {
        let row = api_usage_row(Utc::now(), run_id, topic_id, provider, status_code, tokens);
        self.backend.append_rows(API_USAGE, vec![row]).await
    }

    pub async fn log_error(&self, run_id: &str, topic_id: &str, message: &str) -> SheetsResult<()> {
        let row = error_row(Utc::now(), run_id, topic_id, message);
        self.backend.append_rows(ERROR_LOG, vec![row]).await
    }

    /// Create or repair every table; with `reset`, drop all data rows.
    pub async fn ensure_schema(&self, reset: bool) -> SheetsResult<SchemaReport> {
        let mut updated = Vec::new();
        for (table, headers) in TABLES {
            if self.backend.ensure_table(table, headers, reset).await? {
                updated.push(table.to_string());
            }
        }
        info!(updated = ?updated, reset, "Schema ensured");
        Ok(SchemaReport { updated, reset })
    }

    pub async fn db_status(&self) -> SheetsResult<DbStatus> {
        let mut tables = BTreeMap::new();
        for (table, _) in TABLES {
            tables.insert(table.to_string(), self.backend.data_row_count(table).await?);
        }
        let total_records = tables.values().sum();
        Ok(DbStatus { tables, total_records })
    }

    /// Every topic row as header → value maps.
    pub async fn topic_rows(&self) -> SheetsResult<Vec<BTreeMap<String, String>>> {
        let rows = self.backend.read_all(ESSENTIAL_CONTENT).await?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        Ok(data
            .iter()
            .map(|row| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect())
    }
}
