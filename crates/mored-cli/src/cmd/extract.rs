//! `mrd extract`

use anyhow::{Context, Result, bail};
use mored_core::{Reporter, packager};
use std::path::Path;

use crate::ConsoleReporter;

/// Unpack `archive` into `dest`.
pub fn extract(archive: &Path, dest: &Path, dry_run: bool, reporter: &ConsoleReporter) -> Result<()> {
    if !archive.is_file() {
        bail!("Archive not found: {}", archive.display());
    }

    if dry_run {
        reporter.info(&format!(
            "would extract {} into {}",
            archive.display(),
            dest.display()
        ));
        return Ok(());
    }

    let files = packager::extract(archive, dest)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    for file in &files {
        reporter.info(&file.relative_path.display().to_string());
    }
    reporter.success(&format!(
        "Extracted {} file(s) into {}",
        files.len(),
        dest.display()
    ));
    Ok(())
}
