use crate::error::{EtlError, Result};
use reqwest::Client;
use std::time::Instant;
use tracing::{info, instrument};
use url::Url;

/// Download the archive at `url` and return its bytes.
/// The whole body is buffered in memory before extraction.
#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn download_archive(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let transport = |source: reqwest::Error| EtlError::Transport {
        url: url.to_string(),
        source,
    };

    let start = Instant::now();
    let bytes = client
        .get(url.clone())
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(transport)?
        .bytes()
        .await
        .map_err(transport)?;

    info!(bytes = bytes.len(), elapsed = ?start.elapsed(), "downloaded archive");
    Ok(Vec::from(bytes))
}
