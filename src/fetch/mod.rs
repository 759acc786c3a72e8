// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;

pub mod tables;
pub mod urls;

/// Build the shared HTTP client. The default User-Agent identifies this
/// scraper and its version; a custom one can be supplied via config.
pub fn build_client(user_agent: Option<&str>) -> Result<Client> {
    let agent = user_agent
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
    Client::builder()
        .user_agent(agent)
        .build()
        .context("building HTTP client")
}
