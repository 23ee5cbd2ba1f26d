//! mrd - mored packaging CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use mored_core::{Reporter, StoreConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mored_cli::cmd;
use mored_cli::cmd::build::BuildArgs;
use mored_cli::{Cli, Commands, ConsoleReporter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reporter = ConsoleReporter::new(cli.quiet);

    match run(cli, reporter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, reporter: ConsoleReporter) -> Result<()> {
    let dry_run = cli.dry_run;
    let config = cli.config.as_deref();
    debug!(dry_run, quiet = reporter.is_quiet(), ?config, "starting");

    match cli.command {
        Commands::Build {
            kind,
            includes,
            dist,
            push,
            roots,
            excludes,
            strict,
        } => {
            let args = BuildArgs {
                kind: kind.into(),
                includes,
                dist,
                push,
                roots,
                excludes,
                strict,
            };
            cmd::build::build(&args, config, dry_run, reporter).await
        }
        Commands::Store {
            endpoint,
            key,
            secret,
            bucket,
            domain,
            prefix,
            region,
        } => {
            let store = StoreConfig {
                domain,
                endpoint,
                access_key: key,
                secret_key: secret,
                bucket,
                prefix,
                region,
            };
            cmd::store::store(store, config, dry_run, &reporter)
        }
        Commands::Check { dirs } => cmd::check::check(&dirs, &reporter),
        Commands::Extract { archive, dest } => {
            cmd::extract::extract(&archive, &dest, dry_run, &reporter)
        }
    }
}
