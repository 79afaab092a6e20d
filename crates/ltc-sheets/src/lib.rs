//! Spreadsheet-backed persistence for topics.
//!
//! This crate provides:
//! - The [`TableBackend`] abstraction with 1-based row/column addressing
//! - A Google Sheets REST v4 backend with token refresh and retries
//! - An in-memory backend for local runs and tests
//! - [`TopicStore`]: topic rows, API-usage log and error log

pub mod backend;
pub mod error;
pub mod google;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;

use std::sync::Arc;

use tracing::info;

use ltc_storage::TokenCache;

pub use backend::{column_letter, TableBackend};
pub use error::{SheetsError, SheetsResult};
pub use google::{GoogleSheetsClient, SheetsConfig};
pub use memory::InMemoryTable;
pub use retry::RetryConfig;
pub use store::{DbStatus, SchemaReport, TopicStore};

/// Google Sheets when `GOOGLE_SHEET_ID` is set, otherwise in-memory tables.
pub fn backend_from_env() -> SheetsResult<Arc<dyn TableBackend>> {
    match SheetsConfig::from_env() {
        Some(config) => {
            let tokens = Arc::new(TokenCache::from_env()?);
            info!(spreadsheet_id = %config.spreadsheet_id, "Using Google Sheets backend");
            Ok(Arc::new(GoogleSheetsClient::new(config, tokens)?))
        }
        None => {
            info!("GOOGLE_SHEET_ID not set, using in-memory tables");
            Ok(Arc::new(InMemoryTable::new()))
        }
    }
}
