// src/fetch/tables.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use crate::flatten::Table;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

async fn get_text_core(client: &Client, url: &Url) -> Result<String> {
    debug!("fetching {}", url);
    Ok(client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .text()
        .await
        .with_context(|| format!("reading body from {}", url))?)
}

async fn get_text_with_retry(client: &Client, url: &Url) -> Result<String> {
    let mut attempts = 0;
    loop {
        match get_text_core(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) if attempts < MAX_RETRIES => {
                attempts += 1;
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Fetch one dataset endpoint and decode the JSON-stat body.
///
/// Transport failures are retried with exponential backoff; a body that does
/// not decode as a table is an error for this dataset only.
pub async fn download_table(client: &Client, url: &Url) -> Result<Table> {
    let body = get_text_with_retry(client, url).await?;
    let table: Table =
        serde_json::from_str(&body).with_context(|| format!("decoding JSON-stat body from {}", url))?;
    Ok(table)
}
