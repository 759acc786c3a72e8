// src/fetch/urls.rs

use anyhow::{anyhow, Result};
use url::Url;

/// Build the statistics endpoint URL for one dataset:
/// `<base>/<code>?format=JSON&lang=EN`.
pub fn dataset_url(base: &str, code: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL `{}` cannot carry a path", base))?
        .pop_if_empty()
        .push(code);
    url.query_pairs_mut()
        .append_pair("format", "JSON")
        .append_pair("lang", "EN");
    Ok(url)
}
