//! Google Sheets REST v4 backend.
//!
//! - Bearer tokens from an [`AccessTokenSource`], refreshed once on 401
//! - Exponential backoff on 429, 5xx and network errors
//! - One `sheets_request` span and request metrics per operation

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, info_span, Instrument};

use ltc_storage::AccessTokenSource;

use crate::backend::{column_letter, TableBackend};
use crate::error::{SheetsError, SheetsResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// `None` when `GOOGLE_SHEET_ID` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let spreadsheet_id = std::env::var("GOOGLE_SHEET_ID").ok().filter(|s| !s.trim().is_empty())?;
        let timeout_secs: u64 = std::env::var("SHEETS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Some(Self {
            base_url: std::env::var("SHEETS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig::from_env(),
            ..Self::new(spreadsheet_id)
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct GoogleSheetsClient {
    http: Client,
    config: SheetsConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(config: SheetsConfig, tokens: Arc<dyn AccessTokenSource>) -> SheetsResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("ltc-sheets/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SheetsError::Network)?;

        Ok(Self { http, config, tokens })
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.spreadsheet_id
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    /// Send with a bearer token, refreshing it once on 401.
    async fn send<F>(&self, build: F) -> SheetsResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.access_token().await?;
        let mut response = build(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Sheets token rejected, refreshing");
            self.tokens.invalidate().await;
            let token = self.tokens.access_token().await?;
            response = build(&token).send().await?;
        }

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::handle_error_response(response).await)
        }
    }

    async fn handle_error_response(response: Response) -> SheetsError {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        SheetsError::from_http_status(status, format!("{} failed: {}", url, body))
    }

    async fn execute<T, F, Fut>(&self, operation: &str, table: &str, op: F) -> SheetsResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SheetsResult<T>>,
    {
        let span = info_span!("sheets_request", operation = %operation, table = %table);
        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op).instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status(),
        };
        record_request(operation, status, start.elapsed().as_millis() as f64);
        result
    }

    async fn get_values(&self, range: &str) -> SheetsResult<Vec<Vec<String>>> {
        let this = self;
        let url = self.values_url(range);
        let url = url.as_str();
        let range_values: ValueRange = self
            .execute("get_values", range, move || async move {
                let response = this.send(|token| this.http.get(url).bearer_auth(token)).await?;
                Ok(response.json::<ValueRange>().await?)
            })
            .await?;

        Ok(range_values
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn sheet_titles(&self) -> SheetsResult<Vec<String>> {
        let this = self;
        let url = format!("{}?fields=sheets.properties.title", self.spreadsheet_url());
        let url = url.as_str();
        let meta: SpreadsheetMeta = self
            .execute("get_spreadsheet", "", move || async move {
                let response = this.send(|token| this.http.get(url).bearer_auth(token)).await?;
                Ok(response.json::<SpreadsheetMeta>().await?)
            })
            .await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn post_json(&self, operation: &str, table: &str, url: &str, body: &Value) -> SheetsResult<()> {
        let this = self;
        self.execute(operation, table, move || async move {
            this.send(|token| this.http.post(url).bearer_auth(token).json(body)).await?;
            Ok(())
        })
        .await
    }

    async fn put_values(&self, operation: &str, table: &str, range: &str, values: Value) -> SheetsResult<()> {
        let this = self;
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));
        let url = url.as_str();
        let body = json!({ "majorDimension": "ROWS", "values": values });
        let body = &body;
        self.execute(operation, table, move || async move {
            this.send(|token| this.http.put(url).bearer_auth(token).json(body)).await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TableBackend for GoogleSheetsClient {
    async fn append_rows(&self, table: &str, rows: Vec<Vec<String>>) -> SheetsResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("{}!A1", table))
        );
        let count = rows.len();
        self.post_json("append_rows", table, &url, &json!({ "values": rows }))
            .await?;
        debug!(table = %table, rows = count, "Appended rows");
        Ok(())
    }

    async fn find_row_by_key(&self, table: &str, key_column: usize, key: &str) -> SheetsResult<Option<usize>> {
        let letter = column_letter(key_column);
        let column = self.get_values(&format!("{}!{}:{}", table, letter, letter)).await?;
        Ok(column
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.first().map(String::as_str) == Some(key))
            .map(|(i, _)| i + 1))
    }

    async fn update_cell(&self, table: &str, row: usize, column: usize, value: &str) -> SheetsResult<()> {
        let range = format!("{}!{}{}", table, column_letter(column), row);
        self.put_values("update_cell", table, &range, json!([[value]])).await
    }

    async fn read_all(&self, table: &str) -> SheetsResult<Vec<Vec<String>>> {
        self.get_values(table).await
    }

    async fn ensure_table(&self, table: &str, headers: &[&str], reset: bool) -> SheetsResult<bool> {
        let mut changed = false;

        if !self.sheet_titles().await?.iter().any(|t| t == table) {
            let url = format!("{}:batchUpdate", self.spreadsheet_url());
            let body = json!({ "requests": [{ "addSheet": { "properties": { "title": table } } }] });
            self.post_json("add_sheet", table, &url, &body).await?;
            info!(table = %table, "Created sheet");
            changed = true;
        }

        let current = self.get_values(&format!("{}!1:1", table)).await?;
        let wanted: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        if current.first() != Some(&wanted) {
            self.put_values("write_headers", table, &format!("{}!A1", table), json!([wanted]))
                .await?;
            changed = true;
        }

        if reset {
            let url = format!("{}:clear", self.values_url(&format!("{}!A2:ZZ", table)));
            self.post_json("clear_rows", table, &url, &json!({})).await?;
            info!(table = %table, "Cleared data rows");
            changed = true;
        }

        Ok(changed)
    }
}
