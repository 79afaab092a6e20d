//! Exponential backoff with jitter for Sheets calls.
//!
//! 429 answers wait for the server-suggested delay; network errors and 5xx
//! back off exponentially up to a cap. Other failures return immediately.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info_span, warn, Instrument};

use crate::error::{SheetsError, SheetsResult};
use crate::metrics::record_retry;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_ms = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        Self {
            max_retries: defaults.max_retries,
            base_delay_ms: env_ms("SHEETS_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_ms("SHEETS_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    /// No retries, for tests against mock servers.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Run `op` until it succeeds, fails permanently or retries run out.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> SheetsResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = SheetsResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("sheets_retry", operation = %operation, attempt = attempt + 1);
        let err: SheetsError = match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= config.max_retries {
            return Err(err);
        }

        let delay = backoff_delay(config, attempt, err.retry_after_ms());
        warn!(
            operation = %operation,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Sheets request failed, retrying: {}",
            err
        );
        record_retry(operation);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn backoff_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    let ceiling = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_delay_ms);

    // Time-based jitter in [0, ceiling), floored at the base delay.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let jittered = ceiling.saturating_mul(u64::from(nanos % 1000)) / 1000;
    Duration::from_millis(jittered.max(config.base_delay_ms))
}
