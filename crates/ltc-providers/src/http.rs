//! Shared HTTP plumbing for the adapters.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use tracing::{info_span, warn, Instrument};

use crate::error::{ProviderError, ProviderFailure, ProviderResult};
use crate::metrics::record_call;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("ltc-providers/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-2xx response into a classified failure.
pub(crate) async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::status(status.as_u16(), &body).into())
}

/// Run one provider call inside a span and record its outcome.
pub(crate) async fn instrumented<T, Fut>(provider: &'static str, operation: &'static str, fut: Fut) -> ProviderResult<T>
where
    Fut: Future<Output = ProviderResult<T>>,
{
    let span = info_span!("provider_call", provider = provider, operation = operation);
    let start = Instant::now();
    let result = fut.instrument(span).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(ProviderFailure::Retryable(_)) => "retryable",
        Err(ProviderFailure::Fatal(_)) => "fatal",
    };
    if let Err(e) = &result {
        warn!(provider = provider, operation = operation, "Provider call failed: {}", e);
    }
    record_call(provider, outcome, start.elapsed().as_millis() as f64);
    result
}
