//! The publish pipeline: scan, validate, build, and optionally push.
//!
//! Per-candidate problems (bad descriptor, duplicate name, archive failure)
//! are recorded in the [`PublishReport`] and the run continues. Scan
//! failures, zero candidates and any remote store error abort the run.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use mored_schema::{INDEX_FILE, Index, PackageKind, PackageName, Version};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attribution;
use crate::config::{ConfigError, PublishConfig};
use crate::descriptor::{self, DescriptorError};
use crate::packager::{self, ArchiveResult, BuildError};
use crate::reporter::Reporter;
use crate::scan::{self, Candidate, ScanError};
use crate::store::{self, IndexStore, StoreError};
use crate::validate::{self, ValidatedChart, ValidationError};

/// Errors that abort a publish run.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Candidate discovery failed or found nothing.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The remote store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Store configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Exclude patterns did not compile.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A staging directory or the local index copy could not be written.
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Push was requested but no store was attached.
    #[error("push requested but no remote store is configured")]
    NoStore,
}

/// Why a candidate was left out before building.
#[derive(Error, Debug)]
pub enum SkipReason {
    /// The descriptor could not be read.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The descriptor broke a rule.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Another candidate already claimed the name.
    #[error("{name} {version} already provided by {}", first.display())]
    Duplicate {
        /// Package name.
        name: PackageName,
        /// Version of the skipped candidate.
        version: Version,
        /// Directory that was kept.
        first: PathBuf,
    },
}

/// What happened to one candidate.
#[derive(Debug)]
pub enum Outcome {
    /// Archived and added to the partial index.
    Built {
        /// Package name.
        name: PackageName,
        /// Package version.
        version: Version,
        /// The archive written.
        archive: ArchiveResult,
    },
    /// Excluded before building.
    Skipped(SkipReason),
    /// Valid, but the archive could not be written.
    Failed(BuildError),
}

/// Outcome for one candidate directory.
#[derive(Debug)]
pub struct CandidateReport {
    /// Index of the candidate in scan order.
    pub position: usize,
    /// The candidate.
    pub candidate: Candidate,
    /// What happened to it.
    pub outcome: Outcome,
}

/// A candidate that passed validation.
#[derive(Debug)]
pub struct Planned {
    /// Index of the candidate in scan order.
    pub position: usize,
    /// The candidate.
    pub candidate: Candidate,
    /// Its validated descriptor.
    pub chart: ValidatedChart,
}

/// Candidates that passed validation, ready to build.
#[derive(Debug)]
pub struct Plan {
    /// Package kind being published.
    pub kind: PackageKind,
    /// Valid candidates in scan order.
    pub ready: Vec<Planned>,
    /// Candidates excluded during validation.
    pub skipped: Vec<CandidateReport>,
}

/// Everything a run did.
#[derive(Debug)]
pub struct PublishReport {
    /// Package kind published.
    pub kind: PackageKind,
    /// Per-candidate outcomes in scan order.
    pub candidates: Vec<CandidateReport>,
    /// Index of the charts built by this run only.
    pub partial: Index,
    /// Index written to the store, when pushed.
    pub merged: Option<Index>,
    /// Keys uploaded to the store.
    pub uploaded: Vec<String>,
}

impl PublishReport {
    fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
        self.candidates.iter().filter(|c| f(&c.outcome)).count()
    }

    /// Number of archives built.
    pub fn built(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Built { .. }))
    }

    /// Number of candidates excluded before building.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// Number of candidates whose archive failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Archives built by this run.
    pub fn archives(&self) -> impl Iterator<Item = &ArchiveResult> {
        self.candidates.iter().filter_map(|c| match &c.outcome {
            Outcome::Built { archive, .. } => Some(archive),
            _ => None,
        })
    }
}

/// Drives one publish run.
#[derive(Debug)]
pub struct Publisher<R: Reporter> {
    config: PublishConfig,
    store: Option<IndexStore>,
    reporter: R,
}

impl<R: Reporter> Publisher<R> {
    /// Publisher without a store; only local builds are possible.
    pub fn new(config: PublishConfig, reporter: R) -> Self {
        Self {
            config,
            store: None,
            reporter,
        }
    }

    /// Attach the remote store used when pushing.
    pub fn with_store(mut self, store: IndexStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Scan and validate without touching `dist` or the network.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Scan`] if discovery fails or finds nothing.
    pub fn plan(
        &self,
        kind: PackageKind,
        roots: &[PathBuf],
        includes: &[String],
    ) -> Result<Plan, PublishError> {
        self.reporter.section(&format!("Scanning {kind}s"));
        let candidates = scan::scan(kind, roots, includes, &[self.config.dist.clone()])?;
        for c in &candidates {
            self.reporter
                .info(&format!("found {kind} {} at {}", c.dir_name(), c.dir.display()));
        }

        self.reporter.section(&format!("Parsing {kind}s"));
        let mut ready: Vec<Planned> = Vec::new();
        let mut skipped = Vec::new();
        let mut seen: HashMap<PackageName, PathBuf> = HashMap::new();

        for (position, candidate) in candidates.into_iter().enumerate() {
            match self.check(kind, &candidate, &seen) {
                Ok(chart) => {
                    seen.insert(chart.name.clone(), candidate.dir.clone());
                    ready.push(Planned {
                        position,
                        candidate,
                        chart,
                    });
                }
                Err(reason) => {
                    self.reporter.skipped(
                        kind,
                        &candidate.dir.display().to_string(),
                        &reason.to_string(),
                    );
                    skipped.push(CandidateReport {
                        position,
                        candidate,
                        outcome: Outcome::Skipped(reason),
                    });
                }
            }
        }

        Ok(Plan {
            kind,
            ready,
            skipped,
        })
    }

    fn check(
        &self,
        kind: PackageKind,
        candidate: &Candidate,
        seen: &HashMap<PackageName, PathBuf>,
    ) -> Result<ValidatedChart, SkipReason> {
        let chart = descriptor::read_chart(&candidate.dir)?;
        let chart = validate::validate(kind, chart, &self.config.default_remote)?;
        if let Some(first) = seen.get(&chart.name) {
            return Err(SkipReason::Duplicate {
                name: chart.name.clone(),
                version: chart.version.clone(),
                first: first.clone(),
            });
        }
        Ok(chart)
    }

    /// Run the whole pipeline for one package kind.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] for failures that abort the run; problems
    /// with single candidates are recorded in the report instead.
    pub async fn run(
        &self,
        kind: PackageKind,
        roots: &[PathBuf],
        includes: &[String],
    ) -> Result<PublishReport, PublishError> {
        let started = Instant::now();
        if self.config.push && self.store.is_none() {
            return Err(PublishError::NoStore);
        }

        let plan = self.plan(kind, roots, includes)?;
        let mut report = self.build(plan)?;

        if self.config.push {
            if report.built() == 0 {
                self.reporter
                    .warning("nothing was built, the remote index only gains an author entry");
            }
            if let Some(store) = &self.store {
                self.push(store, &mut report).await?;
            }
        }

        self.reporter.summary(
            report.built(),
            report.skipped(),
            report.failed(),
            started.elapsed().as_secs_f64(),
        );
        Ok(report)
    }

    /// Build every planned candidate into the staging directory.
    ///
    /// The staging directory for the kind is emptied first.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the staging directory cannot be prepared
    /// or an exclude pattern is invalid.
    pub fn build(&self, plan: Plan) -> Result<PublishReport, PublishError> {
        let kind = plan.kind;
        self.reporter.section(&format!("Building {kind}s"));

        let excludes = packager::compile_excludes(&self.config.excludes)?;
        let staging = self.config.staging_dir(kind);
        reset_dir(&staging)?;

        let mut candidates = plan.skipped;
        let mut partial = Index::new();

        for Planned {
            position,
            candidate,
            chart,
        } in plan.ready
        {
            let dest = staging.join(chart.archive_file_name());
            match packager::build(&candidate.dir, &dest, &excludes) {
                Ok(archive) => {
                    let mut chart = chart.into_inner();
                    chart.stamp(archive.digest.to_string(), Utc::now());
                    info!(
                        name = %chart.name,
                        version = %chart.version,
                        digest = %archive.digest,
                        "built"
                    );
                    self.reporter
                        .built(kind, &chart.name, &chart.version, archive.size);
                    let outcome = Outcome::Built {
                        name: chart.name.clone(),
                        version: chart.version.clone(),
                        archive,
                    };
                    partial.insert(kind, chart);
                    candidates.push(CandidateReport {
                        position,
                        candidate,
                        outcome,
                    });
                }
                Err(e) => {
                    warn!(dir = %candidate.dir.display(), error = %e, "build failed");
                    self.reporter.failed(
                        kind,
                        &candidate.dir.display().to_string(),
                        &e.to_string(),
                    );
                    candidates.push(CandidateReport {
                        position,
                        candidate,
                        outcome: Outcome::Failed(e),
                    });
                }
            }
        }
        candidates.sort_by_key(|c| c.position);

        Ok(PublishReport {
            kind,
            candidates,
            partial,
            merged: None,
            uploaded: Vec::new(),
        })
    }

    /// Upload archives, merge the partial index into the remote one and
    /// write it back.
    ///
    /// The remote index is fetched exactly once. The merged document is
    /// also written to `<dist>/index.yaml` before upload.
    async fn push(&self, store: &IndexStore, report: &mut PublishReport) -> Result<(), PublishError> {
        let kind = report.kind;
        self.reporter.section(&format!("Pushing {kind}s"));

        for archive in report.archives().cloned().collect::<Vec<_>>() {
            let key = store.upload_artifact(kind, &archive.path).await?;
            self.reporter.info(&format!("uploaded {key}"));
            report.uploaded.push(key);
        }

        self.reporter.info("loading remote index");
        let mut index = store.load_remote().await?;
        index.merge(report.partial.clone());
        index.rotate_author(attribution::current_author(self.config.lookup_ip).await);

        let data = store::serialize(&index)?;
        let local = self.config.dist.join(INDEX_FILE);
        write_file(&local, &data)?;
        debug!(path = %local.display(), "wrote merged index");

        let key = store.index_key();
        store.put(&key, data).await?;
        self.reporter.success(&format!("pushed {key}"));
        report.uploaded.push(key);
        report.merged = Some(index);
        Ok(())
    }
}

fn reset_dir(dir: &Path) -> Result<(), PublishError> {
    let io_err = |source: std::io::Error| PublishError::Io {
        path: dir.to_path_buf(),
        source,
    };
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(e)),
    }
    fs::create_dir_all(dir).map_err(io_err)
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), PublishError> {
    let io_err = |source: std::io::Error| PublishError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, data).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use mored_schema::DESCRIPTOR_FILE;
    use tempfile::tempdir;

    fn write_kit(root: &Path, dir: &str, descriptor: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(DESCRIPTOR_FILE), descriptor).unwrap();
        fs::write(path.join("kit.sh"), "#!/bin/sh\n").unwrap();
    }

    fn publisher(root: &Path) -> Publisher<NullReporter> {
        Publisher::new(
            PublishConfig {
                dist: root.join("dist"),
                lookup_ip: false,
                ..PublishConfig::default()
            },
            NullReporter,
        )
    }

    #[test]
    fn duplicate_names_keep_the_first() {
        let tmp = tempdir().unwrap();
        write_kit(tmp.path(), "a", "name: foo\nversion: 1.0.0\n");
        write_kit(tmp.path(), "b", "name: foo\nversion: 2.0.0\n");

        let plan = publisher(tmp.path())
            .plan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[])
            .unwrap();
        assert_eq!(plan.ready.len(), 1);
        assert_eq!(plan.ready[0].chart.version, "1.0.0");
        assert!(matches!(
            plan.skipped[0].outcome,
            Outcome::Skipped(SkipReason::Duplicate { .. })
        ));
    }

    #[test]
    fn invalid_descriptors_are_skipped() {
        let tmp = tempdir().unwrap();
        write_kit(tmp.path(), "good", "name: good\nversion: 1.0.0\n");
        write_kit(tmp.path(), "bad", "name: 9bad\nversion: 1.0.0\n");

        let plan = publisher(tmp.path())
            .plan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[])
            .unwrap();
        assert_eq!(plan.ready.len(), 1);
        assert!(matches!(
            plan.skipped[0].outcome,
            Outcome::Skipped(SkipReason::Invalid(ValidationError::Name(_)))
        ));
    }

    #[test]
    fn build_stamps_digest_and_clears_staging() {
        let tmp = tempdir().unwrap();
        write_kit(tmp.path(), "a", "name: foo\nversion: 1.0.0\n");
        let stale = tmp.path().join("dist/kit/stale.tar.gz");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let publisher = publisher(tmp.path());
        let plan = publisher
            .plan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[])
            .unwrap();
        let report = publisher.build(plan).unwrap();

        assert!(!stale.exists());
        assert_eq!(report.built(), 1);
        let chart = &report.partial.versions(PackageKind::Kit, "foo").unwrap()[0];
        let archive = report.archives().next().unwrap();
        assert_eq!(chart.metadata.digest.as_deref(), Some(archive.digest.as_str()));
        assert!(chart.metadata.generated.is_some());
        assert_eq!(archive.path, tmp.path().join("dist/kit/foo_1.0.0.tar.gz"));
    }

    #[test]
    fn report_keeps_scan_order() {
        let tmp = tempdir().unwrap();
        write_kit(tmp.path(), "a", "name: 1bad\nversion: 1.0.0\n");
        write_kit(tmp.path(), "b", "name: good\nversion: 1.0.0\n");
        write_kit(tmp.path(), "c", "name: good\nversion: 2.0.0\n");
        write_kit(tmp.path(), "d", "name: other\nversion: 1.0.0\n");

        let publisher = publisher(tmp.path());
        let plan = publisher
            .plan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[])
            .unwrap();
        let report = publisher.build(plan).unwrap();

        let dirs: Vec<String> = report
            .candidates
            .iter()
            .map(|c| c.candidate.dir_name())
            .collect();
        assert_eq!(dirs, ["a", "b", "c", "d"]);
        let positions: Vec<usize> = report.candidates.iter().map(|c| c.position).collect();
        assert_eq!(positions, [0, 1, 2, 3]);
        assert!(matches!(report.candidates[0].outcome, Outcome::Skipped(_)));
        assert!(matches!(report.candidates[1].outcome, Outcome::Built { .. }));
        assert!(matches!(report.candidates[2].outcome, Outcome::Skipped(_)));
        assert!(matches!(report.candidates[3].outcome, Outcome::Built { .. }));
    }

    #[tokio::test]
    async fn push_without_store_is_rejected() {
        let tmp = tempdir().unwrap();
        write_kit(tmp.path(), "a", "name: foo\nversion: 1.0.0\n");
        let publisher = Publisher::new(
            PublishConfig {
                dist: tmp.path().join("dist"),
                push: true,
                lookup_ip: false,
                ..PublishConfig::default()
            },
            NullReporter,
        );
        let err = publisher
            .run(PackageKind::Kit, &[tmp.path().to_path_buf()], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NoStore));
    }
}
