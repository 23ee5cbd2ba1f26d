//! Operating system names as they appear in charts and author records.
//!
//! Charts use the short names common to shell tooling (`darwin`) rather
//! than Rust's target names (`macos`).

use serde::{Deserialize, Serialize};

/// Operating system a package can run on.
///
/// # Example
///
/// ```
/// use mored_schema::Os;
///
/// assert_eq!("macos".parse::<Os>().unwrap(), Os::Darwin);
/// assert_eq!(Os::Linux.as_str(), "linux");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux distributions.
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
    /// FreeBSD.
    Freebsd,
}

impl Os {
    /// The OS this binary was compiled for, if charts have a name for it.
    pub fn current() -> Option<Self> {
        std::env::consts::OS.parse().ok()
    }

    /// Name used in charts and author records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
            Self::Freebsd => "freebsd",
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            "freebsd" => Ok(Self::Freebsd),
            _ => Err(format!("Unknown operating system: {s}")),
        }
    }
}

/// Name of the running OS for author records, falling back to Rust's name.
pub fn current_platform() -> String {
    Os::current().map_or_else(|| std::env::consts::OS.to_string(), |os| os.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::DEFAULT_OS;

    #[test]
    fn rust_names_map_to_chart_names() {
        assert_eq!("macos".parse::<Os>().unwrap(), Os::Darwin);
        assert_eq!("Linux".parse::<Os>().unwrap(), Os::Linux);
        assert!("plan9".parse::<Os>().is_err());
    }

    #[test]
    fn default_os_names_are_known() {
        for os in DEFAULT_OS {
            assert_eq!(os.parse::<Os>().unwrap().as_str(), os);
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn current_platform_on_linux() {
        assert_eq!(current_platform(), "linux");
    }
}
