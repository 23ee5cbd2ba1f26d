//! `mrd check`: validate descriptors in place

use anyhow::{Result, bail};
use mored_core::scan::{self, Candidate, ScanError};
use mored_core::{Reporter, descriptor, validate_all};
use mored_schema::PackageKind;
use std::path::PathBuf;

use crate::ConsoleReporter;

/// Validate every kit and suite under `dirs`, reporting each violation.
pub fn check(dirs: &[PathBuf], reporter: &ConsoleReporter) -> Result<()> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for kind in [PackageKind::Kit, PackageKind::Suite] {
        match scan::scan(kind, dirs, &[], &[]) {
            Ok(found) => candidates.extend(found),
            Err(ScanError::NoCandidates(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    if candidates.is_empty() {
        bail!("No kits or suites found");
    }

    reporter.section(&format!("Checking {} package(s)", candidates.len()));
    let mut invalid = 0;

    for candidate in &candidates {
        let kind = candidate.kind;
        let label = candidate.dir.display().to_string();

        let chart = match descriptor::read_chart(&candidate.dir) {
            Ok(chart) => chart,
            Err(e) => {
                reporter.failed(kind, &label, &e.to_string());
                invalid += 1;
                continue;
            }
        };

        let violations = validate_all(kind, &chart);
        if violations.is_empty() {
            reporter.success(&format!("{kind} {} {}", chart.name, chart.version));
            continue;
        }

        invalid += 1;
        for violation in violations {
            reporter.failed(kind, &label, &violation.to_string());
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} package(s) failed validation", candidates.len());
    }
    reporter.success(&format!("{} package(s) valid", candidates.len()));
    Ok(())
}
