//! `mrd store`: save remote store credentials

use anyhow::{Context, Result};
use mored_core::{ConfigError, Reporter, StoreConfig};
use std::path::Path;

use crate::ConsoleReporter;

/// Fill defaults into `config` and write it to `path` (or the default path).
pub fn store(
    config: StoreConfig,
    path: Option<&Path>,
    dry_run: bool,
    reporter: &ConsoleReporter,
) -> Result<()> {
    let config = config.with_defaults();
    config.ensure_complete()?;

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => StoreConfig::default_path().ok_or(ConfigError::NoHome)?,
    };

    if dry_run {
        reporter.info(&format!("would write store config to {}", path.display()));
        reporter.info(&format!("default remote would be {}", config.remote()));
        return Ok(());
    }

    config
        .save(&path)
        .with_context(|| format!("Failed to save store config to {}", path.display()))?;

    reporter.success(&format!("Saved store config to {}", path.display()));
    reporter.info(&format!("bucket {} at {}", config.bucket, config.endpoint));
    reporter.info(&format!("default remote {}", config.remote()));
    Ok(())
}
