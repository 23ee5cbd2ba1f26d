//! `mrd build kit|suite`

use anyhow::{Context, Result, bail};
use mored_core::publisher::Plan;
use mored_core::{IndexStore, PublishConfig, Publisher, Reporter, StoreConfig};
use mored_schema::{INDEX_FILE, PackageKind};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::ConsoleReporter;
use crate::ui::format_size;

/// Options for one build run, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    /// Kits or suites.
    pub kind: PackageKind,
    /// Directory-name substrings; empty builds everything found.
    pub includes: Vec<String>,
    /// Output directory holding the staging dirs and merged index.
    pub dist: PathBuf,
    /// Upload archives and merge the remote index.
    pub push: bool,
    /// Directories to scan.
    pub roots: Vec<PathBuf>,
    /// Regexes on file base names to leave out of archives.
    pub excludes: Vec<String>,
    /// Treat archive failures as a failed run.
    pub strict: bool,
}

/// Build every matching package, pushing when asked.
pub async fn build(
    args: &BuildArgs,
    config_path: Option<&Path>,
    dry_run: bool,
    reporter: ConsoleReporter,
) -> Result<()> {
    let store_config = load_store_config(config_path, args.push, &reporter)?;

    let publish = PublishConfig {
        dist: args.dist.clone(),
        push: args.push,
        default_remote: store_config.remote(),
        excludes: args.excludes.clone(),
        lookup_ip: true,
    };

    if dry_run {
        let publisher = Publisher::new(publish, reporter);
        let plan = publisher
            .plan(args.kind, &args.roots, &args.includes)
            .context("Failed to scan for packages")?;
        print_plan(&plan, args, &store_config, &reporter);
        return Ok(());
    }

    let mut publisher = Publisher::new(publish, reporter);
    if args.push {
        let store = IndexStore::from_config(&store_config).context("Failed to open remote store")?;
        publisher = publisher.with_store(store);
    }

    let report = publisher
        .run(args.kind, &args.roots, &args.includes)
        .await
        .with_context(|| format!("Failed to build {}s", args.kind))?;

    for archive in report.archives() {
        reporter.info(&format!(
            "{} ({}, sha256:{})",
            archive.path.display(),
            format_size(archive.size),
            archive.digest
        ));
    }

    check_failures(report.failed(), args.kind, args.strict)
}

/// Archive failures are listed by the reporter; only `--strict` turns them
/// into a failed run.
fn check_failures(failed: usize, kind: PackageKind, strict: bool) -> Result<()> {
    if failed == 0 {
        return Ok(());
    }
    if strict {
        bail!("{failed} {kind}(s) could not be archived");
    }
    warn!(failed, %kind, "some archives could not be written");
    Ok(())
}

/// Store settings for this run.
///
/// Without `--push` a broken or missing config only loses the default
/// dependency remote, so it is reported and ignored.
fn load_store_config(
    path: Option<&Path>,
    push: bool,
    reporter: &ConsoleReporter,
) -> Result<StoreConfig> {
    if push {
        let config = StoreConfig::load(path)
            .context("Failed to load store config")?
            .with_defaults();
        config.ensure_complete()?;
        return Ok(config);
    }

    match StoreConfig::load(path) {
        Ok(config) => Ok(config),
        Err(e) => {
            reporter.warning(&format!("ignoring store config: {e}"));
            Ok(StoreConfig::default())
        }
    }
}

fn print_plan(plan: &Plan, args: &BuildArgs, store: &StoreConfig, reporter: &ConsoleReporter) {
    let staging = args.dist.join(plan.kind.as_str());
    reporter.section("Dry run");
    for planned in &plan.ready {
        let chart = &planned.chart;
        reporter.info(&format!(
            "would build {} {} -> {}",
            chart.name,
            chart.version,
            staging.join(chart.archive_file_name()).display()
        ));
    }
    if args.push {
        reporter.info(&format!(
            "would push {} archive(s) to {}/{}/ and merge {}/{INDEX_FILE} with a new author entry",
            plan.ready.len(),
            store.prefix,
            plan.kind,
            store.prefix
        ));
    }
    reporter.summary(plan.ready.len(), plan.skipped.len(), 0, 0.0);
}
