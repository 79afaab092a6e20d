//! HTTP downloads of remote media into the assembler's working directory.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::drive_url::to_direct_download;
use crate::error::{MediaError, MediaResult};

/// Fetch `url` (Drive share links are rewritten first) into `dest`.
///
/// Returns the number of bytes written. Non-200 answers are failures.
pub async fn download_to(client: &Client, url: &str, dest: &Path, timeout: Duration) -> MediaResult<u64> {
    let direct = to_direct_download(url);
    debug!(url = %direct, dest = %dest.display(), "Downloading media");

    let response = client
        .get(&direct)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("{}: {}", direct, e)))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(MediaError::download_failed(format!(
            "{} returned status {}",
            direct,
            status.as_u16()
        )));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::download_failed(format!("{}: {}", direct, e)))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!(url = %direct, bytes = written, "Downloaded media");
    Ok(written)
}
