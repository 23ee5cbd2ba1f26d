//! mrd - build and publish mored kits and suites
//!
//! `mrd build kit` and `mrd build suite` scan source trees for packages,
//! validate their `Mored.yaml` descriptors, write `tar.gz` archives into a
//! staging directory and, with `--push`, merge them into the remote
//! `index.yaml`.
//!
//! # Layout
//!
//! ```text
//! dist/
//! ├── kit/          # kit archives from the last `build kit`
//! ├── suite/        # suite archives from the last `build suite`
//! └── index.yaml    # merged index from the last push
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
pub mod ui;

pub use ui::ConsoleReporter;

use clap::{Parser, Subcommand, ValueEnum};
use mored_schema::PackageKind;
use std::path::PathBuf;

/// Top-level command line.
#[derive(Debug, Parser)]
#[command(name = "mrd")]
#[command(
    author,
    version,
    about = "mrd - build and publish mored kits and suites",
    long_about = None
)]
pub struct Cli {
    /// Config file (defaults to $MORED_CONFIG or ~/.config/mored/config.toml)
    #[arg(short, long, global = true, env = "MORED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// `mrd` subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build kits or suites into archives, optionally pushing them
    Build {
        /// What to build
        kind: KindArg,
        /// Only build packages whose directory name contains one of these
        includes: Vec<String>,
        /// Output directory
        #[arg(short, long, default_value = "dist")]
        dist: PathBuf,
        /// Upload archives and merge the remote index
        #[arg(short, long)]
        push: bool,
        /// Directory to scan (repeatable)
        #[arg(long = "root", default_value = ".")]
        roots: Vec<PathBuf>,
        /// Regex on file base names to leave out of archives (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
        /// Exit non-zero when any archive could not be written
        #[arg(long)]
        strict: bool,
    },
    /// Save remote store credentials
    Store {
        /// S3-compatible API endpoint
        #[arg(short = 'p', long)]
        endpoint: String,
        /// Access key ID
        #[arg(short, long)]
        key: String,
        /// Secret access key
        #[arg(short, long)]
        secret: String,
        /// Bucket name
        #[arg(short, long)]
        bucket: String,
        /// Public base URL (defaults to https://<bucket>.<endpoint>)
        #[arg(short, long, default_value = "")]
        domain: String,
        /// Key prefix inside the bucket
        #[arg(long, default_value = mored_core::config::DEFAULT_PREFIX)]
        prefix: String,
        /// Signing region
        #[arg(long, default_value = mored_core::config::DEFAULT_REGION)]
        region: String,
    },
    /// Validate descriptors without building anything
    Check {
        /// Directories to scan
        #[arg(default_value = ".")]
        dirs: Vec<PathBuf>,
    },
    /// Unpack an archive
    Extract {
        /// Archive to unpack
        archive: PathBuf,
        /// Destination directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },
}

/// Package kind as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Kits (`kit.sh` entry point)
    Kit,
    /// Suites (`suite` or `suite.<ext>` entry point)
    Suite,
}

impl From<KindArg> for PackageKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Kit => PackageKind::Kit,
            KindArg::Suite => PackageKind::Suite,
        }
    }
}
