//! Status callbacks observed by the polling API.

use async_trait::async_trait;

/// Receives every status change of a run and its topics.
///
/// Implementations must be cheap and must not fail; the pipeline never
/// waits on anything but the call itself.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, workflow_id: &str, status: &str);
}

/// Notifier for runs nobody polls.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl StatusNotifier for NoopNotifier {
    async fn notify(&self, _workflow_id: &str, _status: &str) {}
}
