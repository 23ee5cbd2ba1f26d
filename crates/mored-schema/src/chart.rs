//! Chart: the package descriptor plus build metadata for one package version.
//!
//! The same shape is read from `Mored.yaml` in a package directory and
//! written into the shared index. Optional fields are omitted when empty so
//! both documents stay small and stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PackageName, Version};

/// Operating systems a chart supports when the descriptor lists none.
pub const DEFAULT_OS: [&str; 2] = ["linux", "darwin"];

/// Architectures a chart supports when the descriptor lists none.
pub const DEFAULT_ARCH: [&str; 2] = ["amd64", "arm64"];

/// Placeholder a suite's invocation command must contain.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// A kit or suite this chart depends on. Recorded, never resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the required package.
    #[serde(default)]
    pub name: String,
    /// Version constraint (`~`, `^`, `>=` or `<=` prefixed).
    #[serde(default)]
    pub version: String,
    /// Registry the dependency lives in. Filled with the publisher's
    /// remote during validation when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Free-form attribution for a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
}

/// Descriptive metadata plus the fields stamped at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Icon URL shown by registry browsers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Short human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SHA-256 of the built archive. Set by the packager only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Search keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// People responsible for the package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    /// When the archive was built. Set by the packager only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
}

impl Metadata {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.icon.is_none()
            && self.description.is_none()
            && self.digest.is_none()
            && self.keywords.is_empty()
            && self.maintainers.is_empty()
            && self.generated.is_none()
    }
}

/// The package descriptor for one version of a kit or suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// Registry name: ASCII letters, digits and `_`, not starting with a digit.
    #[serde(default)]
    pub name: PackageName,
    /// Display name, defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Strict `MAJOR.MINOR.PATCH` version.
    #[serde(default)]
    pub version: Version,
    /// Invocation command template, suites only. Must contain `{file}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Constraint on the tool version able to consume this chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mored_version: Option<String>,
    /// Supported operating systems (`linux`, `darwin`, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,
    /// Supported CPU architectures (`amd64`, `arm64`, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arch: Vec<String>,
    /// Effect codes a suite declares, suites only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<i64>,
    /// Kits this chart depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep_kits: Vec<Dependency>,
    /// Suites this chart depends on, suites only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep_suites: Vec<Dependency>,
    /// Descriptive and build metadata.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Chart {
    /// Minimal chart with just a name and version.
    pub fn new(name: impl Into<PackageName>, version: impl Into<Version>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Parse a chart from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_yaml` error if the document is not a
    /// well-formed chart.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize this chart as YAML.
    ///
    /// # Errors
    ///
    /// Returns a `serde_yaml` error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Archive file name: `<underscored-name>_<version>.tar.gz`.
    pub fn archive_file_name(&self) -> String {
        archive_file_name(&self.name, &self.version)
    }

    /// Record the build result on this chart.
    pub fn stamp(&mut self, digest: impl Into<String>, generated: DateTime<Utc>) {
        self.metadata.digest = Some(digest.into());
        self.metadata.generated = Some(generated);
    }
}

/// Archive file name for a package version.
///
/// Each part is trimmed and converted from CamelCase to underscores before
/// joining, so `MyKit` 1.0.0 becomes `my_kit_1.0.0.tar.gz`.
pub fn archive_file_name(name: &PackageName, version: &Version) -> String {
    format!(
        "{}_{}.tar.gz",
        name.file_stem(),
        crate::types::camel_to_underscore(version.trim())
    )
}
