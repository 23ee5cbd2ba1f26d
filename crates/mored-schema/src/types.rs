//! Package kinds, names, versions and version constraints.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::sync::LazyLock;

/// Strict `MAJOR.MINOR.PATCH` form, ASCII digits only.
static STRICT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("static regex"));

/// Which kind of package a chart describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Reusable shell-script toolkit, entry point `kit.sh`.
    Kit,
    /// Runnable script bundle with an invocation command template.
    Suite,
}

impl PackageKind {
    /// Both kinds, in the order they are listed in the index.
    pub const ALL: [PackageKind; 2] = [PackageKind::Kit, PackageKind::Suite];

    /// Lowercase name, also used as the staging directory and remote key segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kit => "kit",
            Self::Suite => "suite",
        }
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kit" | "kits" => Ok(Self::Kit),
            "suite" | "suites" => Ok(Self::Suite),
            _ => Err(format!("Unknown package kind: {s}")),
        }
    }
}

/// A package name as written in the descriptor.
///
/// Unlike most registries the name is case-preserving: `MyKit` and `mykit`
/// are different packages. Use [`PackageName::file_stem`] for the
/// underscored form used in artifact file names.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name (stored as-is).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CamelCase converted to lowercase with underscores (`MyKit` -> `my_kit`).
    pub fn file_stem(&self) -> String {
        camel_to_underscore(self.0.trim())
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A package version string.
///
/// Stored verbatim so that whatever an older publisher wrote into the
/// index round-trips unchanged.
///
/// Ordering is total and falls into three tiers, highest first:
/// strict `MAJOR.MINOR.PATCH` versions compared component by component
/// with no width limit, other versions `semver` can parse, and everything
/// else in plain string order. Ties within a tier break on the raw string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the version is in strict `MAJOR.MINOR.PATCH` numeric form.
    pub fn is_strict(&self) -> bool {
        STRICT_VERSION.is_match(&self.0)
    }

    fn components(&self) -> Option<[&str; 3]> {
        if !self.is_strict() {
            return None;
        }
        let mut parts = self.0.split('.');
        Some([parts.next()?, parts.next()?, parts.next()?])
    }
}

/// Compare two ASCII digit strings as unbounded integers.
fn cmp_digits(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        match (self.components(), other.components()) {
            (Some(a), Some(b)) => {
                return a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| cmp_digits(x, y))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| self.0.cmp(&other.0));
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => {}
        }

        match (
            semver::Version::parse(&self.0),
            semver::Version::parse(&other.0),
        ) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Comparison operator of a version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    /// `~1.2.3`: patch-level changes only.
    Tilde,
    /// `^1.2.3`: minor and patch changes.
    Caret,
    /// `>=1.2.3`
    AtLeast,
    /// `<=1.2.3`
    AtMost,
}

impl ConstraintOp {
    /// The textual prefix of this operator.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Tilde => "~",
            Self::Caret => "^",
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

/// Errors produced while parsing a [`Constraint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// The constraint string was empty.
    #[error("constraint is empty")]
    Empty,

    /// The constraint does not start with `~`, `^`, `>=` or `<=`.
    #[error("unsupported prefix in '{0}': use ~, ^, >= or <=")]
    UnsupportedPrefix(String),

    /// The version following the prefix is not `MAJOR.MINOR.PATCH`.
    #[error("'{0}' is not a MAJOR.MINOR.PATCH version")]
    BadVersion(String),
}

/// A version constraint such as `^1.2.3` or `>=0.0.0`.
///
/// Constraints are recorded and validated, never solved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    /// The comparison operator.
    pub op: ConstraintOp,
    /// The version the operator applies to.
    pub version: Version,
}

impl Constraint {
    /// The constraint applied when a chart omits `moredVersion`.
    pub const DEFAULT: &'static str = ">=0.0.0";

    /// Parse a constraint string. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError`] if the string is empty, uses an
    /// unsupported prefix, or the version part is not strict.
    pub fn parse(s: &str) -> Result<Self, ConstraintError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConstraintError::Empty);
        }

        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (ConstraintOp::AtLeast, rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (ConstraintOp::AtMost, rest)
        } else if let Some(rest) = s.strip_prefix('~') {
            (ConstraintOp::Tilde, rest)
        } else if let Some(rest) = s.strip_prefix('^') {
            (ConstraintOp::Caret, rest)
        } else {
            return Err(ConstraintError::UnsupportedPrefix(s.to_string()));
        };

        let version = Version::new(rest.trim());
        if !version.is_strict() {
            return Err(ConstraintError::BadVersion(rest.trim().to_string()));
        }
        Ok(Self { op, version })
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op.prefix(), self.version)
    }
}

impl std::str::FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Convert `CamelCase` to lowercase with underscores.
///
/// The first character is only lowercased; every later uppercase letter is
/// prefixed with `_`. Acronyms are not special-cased (`HTTPKit` ->
/// `h_t_t_p_kit`), matching artifact names already in published indexes.
pub fn camel_to_underscore(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}
