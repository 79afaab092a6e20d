//! Table abstraction over a spreadsheet.
//!
//! Rows and columns are 1-based like the spreadsheet itself; row 1 holds
//! the headers.

use async_trait::async_trait;

use crate::error::SheetsResult;

#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Append rows after the last non-empty row.
    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> SheetsResult<()>;

    /// Row number of the first data row whose `key_column` equals `key`.
    async fn find_row_by_key(&self, table: &str, key_column: usize, key: &str) -> SheetsResult<Option<usize>>;

    async fn update_cell(&self, table: &str, row: usize, column: usize, value: &str) -> SheetsResult<()>;

    /// Every row, header included.
    async fn read_all(&self, table: &str) -> SheetsResult<Vec<Vec<String>>>;

    /// Create the table if missing and make row 1 equal `headers`. With
    /// `reset`, every data row is removed. Returns whether anything changed.
    async fn ensure_table(&self, table: &str, headers: &[&str], reset: bool) -> SheetsResult<bool>;

    /// Write several cells of one row. Writes are independent; a failure
    /// part way leaves earlier cells written.
    async fn update_cells(&self, table: &str, row: usize, cells: &[(usize, String)]) -> SheetsResult<()> {
        for (column, value) in cells {
            self.update_cell(table, row, *column, value).await?;
        }
        Ok(())
    }

    /// Number of data rows, excluding the header.
    async fn data_row_count(&self, table: &str) -> SheetsResult<usize> {
        Ok(self.read_all(table).await?.len().saturating_sub(1))
    }
}

/// Spreadsheet column letters for a 1-based index (`1` → `A`, `27` → `AA`).
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
