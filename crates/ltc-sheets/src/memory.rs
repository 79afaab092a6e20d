//! In-memory table backend, used when no spreadsheet is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::TableBackend;
use crate::error::{SheetsError, SheetsResult};

#[derive(Debug, Default)]
pub struct InMemoryTable {
    tables: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableBackend for InMemoryTable {
    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> SheetsResult<()> {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    async fn find_row_by_key(&self, table: &str, key_column: usize, key: &str) -> SheetsResult<Option<usize>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(None);
        };
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| {
                key_column
                    .checked_sub(1)
                    .and_then(|c| row.get(c))
                    .map(String::as_str)
                    == Some(key)
            })
            .map(|(i, _)| i + 1))
    }

    async fn update_cell(&self, table: &str, row: usize, column: usize, value: &str) -> SheetsResult<()> {
        if row == 0 || column == 0 {
            return Err(SheetsError::invalid_response(format!(
                "cell {}:{} is out of range",
                row, column
            )));
        }
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();
        Ok(())
    }

    async fn read_all(&self, table: &str) -> SheetsResult<Vec<Vec<String>>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    async fn ensure_table(&self, table: &str, headers: &[&str], reset: bool) -> SheetsResult<bool> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let wanted: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

        let mut changed = false;
        match rows.first_mut() {
            Some(first) if *first == wanted => {}
            Some(first) => {
                *first = wanted;
                changed = true;
            }
            None => {
                rows.push(wanted);
                changed = true;
            }
        }
        if reset && rows.len() > 1 {
            rows.truncate(1);
            changed = true;
        }
        Ok(changed)
    }
}
