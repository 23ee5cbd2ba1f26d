//! Descriptor validation.
//!
//! Every rule is a small function returning `Result<(), ValidationError>`.
//! [`validate`] runs them in a fixed order and stops at the first failure,
//! then fills in defaults; [`validate_all`] runs every rule and collects
//! each violation.
//!
//! # Rules
//!
//! - `name`: ASCII letters, digits and `_`, not starting with a digit,
//!   at most 128 characters
//! - `fullName`: at most 128 characters, defaults to `name`
//! - `version`: strict `MAJOR.MINOR.PATCH`
//! - `moredVersion`: empty (defaults to `>=0.0.0`) or a `~`, `^`, `>=`,
//!   `<=` constraint
//! - `depKits` / `depSuites`: constraint required, remote must be an
//!   `http(s)://` URL when given, defaults to the publisher's remote
//! - suites only: `command` contains `{file}`, `effects` is non-empty

use std::sync::LazyLock;

use mored_schema::chart::{DEFAULT_ARCH, DEFAULT_OS, FILE_PLACEHOLDER};
use mored_schema::{Chart, Constraint, ConstraintError, Dependency, PackageKind, Version};
use regex::Regex;
use thiserror::Error;

/// Maximum length of `name` and `fullName`.
pub const MAX_NAME_LENGTH: usize = 128;

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").expect("static regex"));

static REMOTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("static regex"));

/// A descriptor rule violation. Each variant names the offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `name` is empty, too long, or has characters outside `[A-Za-z0-9_]`.
    #[error(
        "name '{0}' can only contain letters, numbers, underscores, the first can not be a number, maximum length of 128"
    )]
    Name(String),

    /// `fullName` is longer than [`MAX_NAME_LENGTH`].
    #[error("fullName is {0} characters, maximum length of 128")]
    FullName(usize),

    /// `version` is not `MAJOR.MINOR.PATCH`.
    #[error("version '{0}' is incorrect, only x.x.x formats are supported")]
    Version(String),

    /// `moredVersion` is not a supported constraint.
    #[error("moredVersion supports prefixes ~, ^, >= and <=, default >=0.0.0: {0}")]
    MoredVersion(ConstraintError),

    /// A dependency's version constraint is invalid.
    #[error("dep {kind} {name} version supports prefixes ~, ^, >= and <=: {source}")]
    DependencyVersion {
        /// Kind of the dependency list (`kit` or `suite`).
        kind: PackageKind,
        /// Dependency name.
        name: String,
        /// Why the constraint was rejected.
        source: ConstraintError,
    },

    /// A dependency's remote is not an absolute `http(s)://` URL.
    #[error(
        "dep {kind} {name} repository address '{remote}' is invalid, only http(s):// URLs are supported"
    )]
    DependencyRemote {
        /// Kind of the dependency list (`kit` or `suite`).
        kind: PackageKind,
        /// Dependency name.
        name: String,
        /// The rejected remote.
        remote: String,
    },

    /// A suite's `command` lacks the `{file}` placeholder.
    #[error("command must contain the {{file}} placeholder")]
    Command,

    /// A suite declares no effect codes.
    #[error("effects is required")]
    Effects,
}

impl ValidationError {
    /// Descriptor field the violation refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::FullName(_) => "fullName",
            Self::Version(_) => "version",
            Self::MoredVersion(_) => "moredVersion",
            Self::DependencyVersion { kind, .. } | Self::DependencyRemote { kind, .. } => {
                match kind {
                    PackageKind::Kit => "depKits",
                    PackageKind::Suite => "depSuites",
                }
            }
            Self::Command => "command",
            Self::Effects => "effects",
        }
    }
}

/// A chart that passed every rule and carries all defaults.
///
/// Only [`validate`] constructs one, so holding a `ValidatedChart` means the
/// packager can trust its name and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChart(Chart);

impl ValidatedChart {
    /// Borrow the chart.
    pub fn chart(&self) -> &Chart {
        &self.0
    }

    /// Take the chart out.
    pub fn into_inner(self) -> Chart {
        self.0
    }
}

impl std::ops::Deref for ValidatedChart {
    type Target = Chart;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Check `name`.
///
/// # Errors
///
/// Returns [`ValidationError::Name`] unless `name` matches
/// `^[A-Za-z_][A-Za-z0-9_]{0,127}$`.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if NAME.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::Name(name.to_string()))
    }
}

/// Check the optional `fullName`.
///
/// # Errors
///
/// Returns [`ValidationError::FullName`] when longer than 128 characters.
pub fn validate_full_name(full_name: Option<&str>) -> Result<(), ValidationError> {
    let len = full_name.map_or(0, |s| s.chars().count());
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::FullName(len));
    }
    Ok(())
}

/// Check `version`.
///
/// # Errors
///
/// Returns [`ValidationError::Version`] unless the version is strict.
pub fn validate_version(version: &Version) -> Result<(), ValidationError> {
    if version.is_strict() {
        Ok(())
    } else {
        Err(ValidationError::Version(version.to_string()))
    }
}

/// Check the optional `moredVersion`. Empty means the default.
///
/// # Errors
///
/// Returns [`ValidationError::MoredVersion`] for unsupported constraints.
pub fn validate_mored_version(constraint: Option<&str>) -> Result<(), ValidationError> {
    match constraint.map(str::trim) {
        None | Some("") => Ok(()),
        Some(s) => Constraint::parse(s)
            .map(|_| ())
            .map_err(ValidationError::MoredVersion),
    }
}

/// Check one dependency of a `kind` dependency list.
///
/// # Errors
///
/// Returns [`ValidationError::DependencyVersion`] for a missing or
/// unsupported constraint and [`ValidationError::DependencyRemote`] for a
/// remote that is not an `http(s)://` URL.
pub fn validate_dependency(kind: PackageKind, dep: &Dependency) -> Result<(), ValidationError> {
    Constraint::parse(&dep.version).map_err(|source| ValidationError::DependencyVersion {
        kind,
        name: dep.name.clone(),
        source,
    })?;

    match dep.remote.as_deref() {
        Some(remote) if !remote.is_empty() && !REMOTE_URL.is_match(remote) => {
            Err(ValidationError::DependencyRemote {
                kind,
                name: dep.name.clone(),
                remote: remote.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Check a suite's invocation command.
///
/// # Errors
///
/// Returns [`ValidationError::Command`] when the command is absent or lacks
/// `{file}`.
pub fn validate_command(command: Option<&str>) -> Result<(), ValidationError> {
    match command {
        Some(c) if c.contains(FILE_PLACEHOLDER) => Ok(()),
        _ => Err(ValidationError::Command),
    }
}

/// Check a suite's effect codes.
///
/// # Errors
///
/// Returns [`ValidationError::Effects`] when the list is empty.
pub fn validate_effects(effects: &[i64]) -> Result<(), ValidationError> {
    if effects.is_empty() {
        Err(ValidationError::Effects)
    } else {
        Ok(())
    }
}

/// Run every rule in order and collect each violation.
pub fn validate_all(kind: PackageKind, chart: &Chart) -> Vec<ValidationError> {
    let mut results = vec![
        validate_name(chart.name.as_str()),
        validate_full_name(chart.full_name.as_deref()),
        validate_version(&chart.version),
        validate_mored_version(chart.mored_version.as_deref()),
    ];
    results.extend(
        chart
            .dep_kits
            .iter()
            .map(|d| validate_dependency(PackageKind::Kit, d)),
    );
    results.extend(
        chart
            .dep_suites
            .iter()
            .map(|d| validate_dependency(PackageKind::Suite, d)),
    );
    if kind == PackageKind::Suite {
        results.push(validate_command(chart.command.as_deref()));
        results.push(validate_effects(&chart.effects));
    }
    results.into_iter().filter_map(Result::err).collect()
}

/// Validate `chart` as a `kind` and fill in every default.
///
/// Dependencies without a remote get `default_remote` (left unset when
/// that is empty). Kits lose any suite-only fields, and build metadata the
/// author may have written (`digest`, `generated`) is cleared so only the
/// packager sets it.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in rule order.
pub fn validate(
    kind: PackageKind,
    mut chart: Chart,
    default_remote: &str,
) -> Result<ValidatedChart, ValidationError> {
    if let Some(err) = validate_all(kind, &chart).into_iter().next() {
        return Err(err);
    }

    if chart.full_name.as_deref().is_none_or(str::is_empty) {
        chart.full_name = Some(chart.name.to_string());
    }
    if chart
        .mored_version
        .as_deref()
        .is_none_or(|s| s.trim().is_empty())
    {
        chart.mored_version = Some(Constraint::DEFAULT.to_string());
    }
    if chart.os.is_empty() {
        chart.os = DEFAULT_OS.iter().map(ToString::to_string).collect();
    }
    if chart.arch.is_empty() {
        chart.arch = DEFAULT_ARCH.iter().map(ToString::to_string).collect();
    }

    if kind == PackageKind::Kit {
        chart.command = None;
        chart.effects.clear();
        chart.dep_suites.clear();
    }

    for dep in chart.dep_kits.iter_mut().chain(chart.dep_suites.iter_mut()) {
        if dep.remote.as_deref().is_none_or(str::is_empty) {
            dep.remote = (!default_remote.is_empty()).then(|| default_remote.to_string());
        }
    }

    chart.metadata.digest = None;
    chart.metadata.generated = None;

    Ok(ValidatedChart(chart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const REMOTE: &str = "https://bucket.example.com/repo";

    fn dep(name: &str, version: &str, remote: Option<&str>) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: version.to_string(),
            remote: remote.map(str::to_string),
        }
    }

    fn suite() -> Chart {
        let mut chart = Chart::new("deploy", "1.0.0");
        chart.command = Some("bash {file}".to_string());
        chart.effects = vec![1];
        chart
    }

    #[test]
    fn kit_defaults_are_filled() {
        let mut chart = Chart::new("logging", "1.0.0");
        chart.command = Some("ignored".to_string());
        chart.effects = vec![3];
        chart.dep_suites = vec![dep("other", "^1.0.0", None)];
        chart.dep_kits = vec![dep("colors", "~0.1.0", None)];

        let valid = validate(PackageKind::Kit, chart, REMOTE).unwrap();
        assert_eq!(valid.full_name.as_deref(), Some("logging"));
        assert_eq!(valid.mored_version.as_deref(), Some(">=0.0.0"));
        assert_eq!(valid.os, ["linux", "darwin"]);
        assert_eq!(valid.arch, ["amd64", "arm64"]);
        assert_eq!(valid.command, None);
        assert!(valid.effects.is_empty());
        assert!(valid.dep_suites.is_empty());
        assert_eq!(valid.dep_kits[0].remote.as_deref(), Some(REMOTE));
    }

    #[test]
    fn explicit_values_are_kept() {
        let mut chart = suite();
        chart.full_name = Some("Deploy".to_string());
        chart.mored_version = Some("^0.2.0".to_string());
        chart.os = vec!["linux".to_string()];
        chart.dep_suites = vec![dep("base", ">=1.0.0", Some("http://mirror.local/repo"))];

        let valid = validate(PackageKind::Suite, chart, REMOTE).unwrap();
        assert_eq!(valid.full_name.as_deref(), Some("Deploy"));
        assert_eq!(valid.mored_version.as_deref(), Some("^0.2.0"));
        assert_eq!(valid.os, ["linux"]);
        assert_eq!(valid.command.as_deref(), Some("bash {file}"));
        assert_eq!(
            valid.dep_suites[0].remote.as_deref(),
            Some("http://mirror.local/repo")
        );
    }

    #[test]
    fn author_supplied_build_metadata_is_cleared() {
        let mut chart = Chart::new("logging", "1.0.0");
        chart.stamp("ab".repeat(32), chrono::Utc::now());
        let valid = validate(PackageKind::Kit, chart, REMOTE).unwrap();
        assert_eq!(valid.metadata.digest, None);
        assert_eq!(valid.metadata.generated, None);
    }

    #[test]
    fn empty_default_remote_leaves_remote_unset() {
        let mut chart = Chart::new("logging", "1.0.0");
        chart.dep_kits = vec![dep("colors", "~0.1.0", Some(""))];
        let valid = validate(PackageKind::Kit, chart, "").unwrap();
        assert_eq!(valid.dep_kits[0].remote, None);
    }

    #[test]
    fn constraint_grammar() {
        for ok in ["~1.2.3", "^1.2.3", ">=1.2.3", "<=1.2.3", ""] {
            assert!(validate_mored_version(Some(ok)).is_ok(), "{ok}");
        }
        assert!(validate_mored_version(None).is_ok());
        assert!(validate_mored_version(Some("*1.2.3")).is_err());
        assert!(validate_mored_version(Some(">=1.2")).is_err());
    }

    #[test]
    fn dependency_constraint_is_required() {
        let err = validate_dependency(PackageKind::Kit, &dep("colors", "", None)).unwrap_err();
        assert_eq!(err.field(), "depKits");
        assert!(err.to_string().contains("colors"));
    }

    #[test]
    fn dependency_remote_must_be_http() {
        for bad in ["ftp://host/repo", "host/repo", "https://"] {
            let err =
                validate_dependency(PackageKind::Suite, &dep("base", "^1.0.0", Some(bad)))
                    .unwrap_err();
            assert_eq!(err.field(), "depSuites", "{bad}");
        }
    }

    #[test]
    fn suite_command_needs_placeholder() {
        let mut chart = suite();
        chart.command = Some("bash run.sh".to_string());
        assert_eq!(
            validate(PackageKind::Suite, chart, REMOTE),
            Err(ValidationError::Command)
        );

        let mut chart = suite();
        chart.command = None;
        assert_eq!(
            validate(PackageKind::Suite, chart, REMOTE),
            Err(ValidationError::Command)
        );
    }

    #[test]
    fn suite_effects_required() {
        let mut chart = suite();
        chart.effects.clear();
        assert_eq!(
            validate(PackageKind::Suite, chart, REMOTE),
            Err(ValidationError::Effects)
        );
    }

    #[test]
    fn kits_ignore_suite_rules() {
        assert!(validate(PackageKind::Kit, Chart::new("plain", "0.1.0"), REMOTE).is_ok());
    }

    #[test]
    fn first_violation_wins_but_all_are_collected() {
        let mut chart = Chart::new("1bad", "1.0");
        chart.full_name = Some("x".repeat(129));
        chart.effects.clear();

        assert_eq!(
            validate(PackageKind::Suite, chart.clone(), REMOTE).unwrap_err().field(),
            "name"
        );
        let fields: Vec<_> = validate_all(PackageKind::Suite, &chart)
            .iter()
            .map(ValidationError::field)
            .collect();
        assert_eq!(fields, ["name", "fullName", "version", "command", "effects"]);
    }

    #[test]
    fn full_name_length_counts_characters() {
        assert!(validate_full_name(Some("é".repeat(128).as_str())).is_ok());
        assert_eq!(
            validate_full_name(Some("a".repeat(129).as_str())),
            Err(ValidationError::FullName(129))
        );
    }

    proptest! {
        #[test]
        fn name_accepted_iff_pattern_matches(name in "\\PC{0,140}") {
            let expected = !name.is_empty()
                && name.len() <= MAX_NAME_LENGTH
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit());
            prop_assert_eq!(validate_name(&name).is_ok(), expected);
        }

        #[test]
        fn generated_names_are_accepted(name in "[A-Za-z_][A-Za-z0-9_]{0,127}") {
            prop_assert!(validate_name(&name).is_ok());
        }

        #[test]
        fn strict_versions_are_accepted(a in 0u32..1000, b in 0u32..1000, c in 0u32..1000) {
            let version = Version::new(format!("{a}.{b}.{c}"));
            prop_assert!(validate_version(&version).is_ok());
        }

        #[test]
        fn version_accepted_iff_three_numeric_parts(v in "[0-9.a-z-]{0,12}") {
            let parts: Vec<&str> = v.split('.').collect();
            let expected = parts.len() == 3
                && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            prop_assert_eq!(validate_version(&Version::new(v.clone())).is_ok(), expected);
        }
    }
}
