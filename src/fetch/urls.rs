use crate::error::{EtlError, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector should parse"));

/// Fetch the index page and return the first link whose href ends with `suffix`,
/// resolved against the page URL.
#[instrument(level = "info", skip(client, index), fields(page = %index))]
pub async fn resolve_download_link(client: &Client, index: &Url, suffix: &str) -> Result<Url> {
    let transport = |source: reqwest::Error| EtlError::Transport {
        url: index.to_string(),
        source,
    };

    let html = client
        .get(index.clone())
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(transport)?
        .text()
        .await
        .map_err(transport)?;
    debug!(bytes = html.len(), "fetched index page");

    let link = find_download_link(&html, index, suffix)?;
    info!(link = %link, "resolved download link");
    Ok(link)
}

/// Scan `html` for the first `<a href>` ending with `suffix`.
pub fn find_download_link(html: &str, base: &Url, suffix: &str) -> Result<Url> {
    let document = Html::parse_document(html);
    let href = document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|elem| elem.value().attr("href"))
        .map(str::trim)
        .find(|href| href.ends_with(suffix))
        .ok_or_else(|| EtlError::LinkNotFound {
            page: base.to_string(),
            suffix: suffix.to_string(),
        })?;

    base.join(href).map_err(|source| EtlError::InvalidUrl {
        url: href.to_string(),
        source,
    })
}
