//! Reporter trait for dependency injection
//!
//! This trait allows the publish pipeline to report progress and status
//! without being coupled to a specific terminal implementation.

use mored_schema::{PackageKind, PackageName, Version};

/// Sink for user-facing progress output.
pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Scanning", "Building").
    fn section(&self, title: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// A package archive was written.
    fn built(&self, kind: PackageKind, name: &PackageName, version: &Version, size: u64);

    /// A candidate was left out of this run.
    fn skipped(&self, kind: PackageKind, name: &str, reason: &str);

    /// A candidate passed validation but could not be archived.
    fn failed(&self, kind: PackageKind, name: &str, reason: &str);

    /// Final tally for a run.
    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn built(&self, kind: PackageKind, name: &PackageName, version: &Version, size: u64) {
        (**self).built(kind, name, version, size);
    }
    fn skipped(&self, kind: PackageKind, name: &str, reason: &str) {
        (**self).skipped(kind, name, reason);
    }
    fn failed(&self, kind: PackageKind, name: &str, reason: &str) {
        (**self).failed(kind, name, reason);
    }
    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64) {
        (**self).summary(built, skipped, failed, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn built(&self, _: PackageKind, _: &PackageName, _: &Version, _: u64) {}
    fn skipped(&self, _: PackageKind, _: &str, _: &str) {}
    fn failed(&self, _: PackageKind, _: &str, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: usize, _: f64) {}
}
