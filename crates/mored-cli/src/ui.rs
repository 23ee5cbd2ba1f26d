//! Console output for `mrd`.
//!
//! Progress lines go to stdout, warnings and errors to stderr. In quiet
//! mode only warnings, errors and the final summary are printed.

use crossterm::style::Stylize;
use mored_core::Reporter;
use mored_schema::{PackageKind, PackageName, Version};

/// Status icons used as line prefixes.
pub mod icons {
    /// Informational line.
    pub const INFO: &str = "•";
    /// Completed step.
    pub const SUCCESS: &str = "✓";
    /// Something was left out.
    pub const WARNING: &str = "!";
    /// Something failed.
    pub const ERROR: &str = "✗";
}

/// [`Reporter`] that writes coloured lines to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    /// Create a reporter; `quiet` hides informational output.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Whether informational output is hidden.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", title.bold());
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {}", icons::INFO.dark_grey(), msg);
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {}", icons::SUCCESS.green().bold(), msg);
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("  {} {}", icons::WARNING.yellow().bold(), msg);
    }

    fn error(&self, msg: &str) {
        eprintln!("  {} {}", icons::ERROR.red().bold(), msg);
    }

    fn built(&self, kind: PackageKind, name: &PackageName, version: &Version, size: u64) {
        if self.quiet {
            return;
        }
        println!(
            "  {} {:<6} {:<24} {:<12} {}",
            icons::SUCCESS.green().bold(),
            kind.as_str().dark_grey(),
            name.as_str().cyan(),
            version.to_string(),
            format_size(size).dark_grey(),
        );
    }

    fn skipped(&self, kind: PackageKind, name: &str, reason: &str) {
        eprintln!(
            "  {} skipped {kind} {}: {}",
            icons::WARNING.yellow().bold(),
            name.cyan(),
            reason
        );
    }

    fn failed(&self, kind: PackageKind, name: &str, reason: &str) {
        eprintln!(
            "  {} failed {kind} {}: {}",
            icons::ERROR.red().bold(),
            name.cyan(),
            reason
        );
    }

    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64) {
        let status = if failed == 0 {
            icons::SUCCESS.green().bold()
        } else {
            icons::ERROR.red().bold()
        };
        println!();
        println!(
            "{status} {built} built, {skipped} skipped, {failed} failed {}",
            format!("({elapsed_secs:.1}s)").dark_grey()
        );
    }
}

/// Format bytes for human-readable display
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
