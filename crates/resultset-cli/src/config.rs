//! CLI configuration layering
//!
//! defaults → `--config` TOML file → `RESULTSET_*` environment → flags.

use anyhow::{Context, Result};
use resultset::config::parse_delimiter;
use resultset::{Encoding, IngestConfig};
use std::path::Path;

/// Ingestion settings given on the command line; `None`/empty means unset.
#[derive(Debug, Clone, Default)]
pub struct IngestOverrides {
    pub delimiter: Option<String>,
    pub encodings: Vec<Encoding>,
    pub fill_merged_headers: bool,
    pub keep_systems_without_results: bool,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl IngestOverrides {
    /// Apply the flags on top of `config`.
    pub fn apply(&self, config: &mut IngestConfig) -> Result<()> {
        if let Some(delimiter) = &self.delimiter {
            config.delimiter = parse_delimiter(delimiter)?;
        }
        if !self.encodings.is_empty() {
            config.encodings = self.encodings.clone();
        }
        if self.fill_merged_headers {
            config.fill_merged_headers = true;
        }
        if self.keep_systems_without_results {
            config.require_results = false;
        }
        if let Some(version) = &self.version {
            config.version = version.clone();
        }
        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        config.validate()?;
        Ok(())
    }
}

/// Resolve the ingestion config from every layer, reading the process
/// environment.
pub fn resolve_ingest_config(
    config_path: Option<&Path>,
    overrides: &IngestOverrides,
) -> Result<IngestConfig> {
    resolve_with_env(config_path, overrides, |key| std::env::var(key).ok())
}

/// Resolve the ingestion config with an explicit environment lookup.
pub fn resolve_with_env(
    config_path: Option<&Path>,
    overrides: &IngestOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<IngestConfig> {
    let mut config = match config_path {
        Some(path) => IngestConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => IngestConfig::default(),
    };
    config
        .apply_vars(lookup)
        .context("Invalid RESULTSET_* environment")?;
    overrides.apply(&mut config)?;
    Ok(config)
}
