// src/config.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::datasets;

/// Config file path override; falls back to `config.yaml`, then defaults.
pub const CONFIG_ENV: &str = "EUROSTAT_CONFIG";

static DATASET_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("dataset code pattern should be valid"));

/// Runtime configuration, loaded from an optional YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the statistics API.
    pub base_url: String,
    /// Custom User-Agent header; defaults to `<name>/<version>`.
    pub user_agent: Option<String>,
    /// Cap on records emitted per dataset. Threaded explicitly into the
    /// flattener; intended for bounded test runs. No cap by default.
    pub record_limit: Option<usize>,
    /// Dataset codes to sync; defaults to the built-in catalog.
    pub datasets: Option<Vec<String>>,
    /// Where dataset Parquet files are written.
    pub out_dir: PathBuf,
    /// Where sync history events are recorded.
    pub history_dir: PathBuf,
    /// Skip datasets that already have a `synced` history event. Lets a
    /// partially completed run pick up where it stopped.
    pub resume: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data"
                .to_string(),
            user_agent: None,
            record_limit: None,
            datasets: None,
            out_dir: PathBuf::from("parquet"),
            history_dir: PathBuf::from("history"),
            resume: false,
        }
    }
}

impl Config {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config source: `$EUROSTAT_CONFIG`, else `config.yaml`
    /// when present, else built-in defaults.
    pub fn load_or_default() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            info!(config = %path, "loading config from env override");
            return Self::load(path);
        }
        let fallback = Path::new("config.yaml");
        if fallback.exists() {
            info!("loading config.yaml");
            return Self::load(fallback);
        }
        info!("no config file; using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if let Some(codes) = &self.datasets {
            for code in codes {
                if !DATASET_CODE.is_match(code) {
                    bail!("invalid dataset code `{}` (expected lowercase [a-z0-9_])", code);
                }
            }
        }
        Ok(())
    }

    /// Dataset codes to sync this run.
    pub fn dataset_codes(&self) -> Vec<String> {
        match &self.datasets {
            Some(codes) => codes.clone(),
            None => datasets::all().iter().map(|d| d.code.to_string()).collect(),
        }
    }
}
