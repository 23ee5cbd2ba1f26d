//! Store credentials and publish settings.
//!
//! Store credentials live in a TOML file (`~/.config/mored/config.toml`
//! unless `$MORED_CONFIG` points elsewhere) under a `[store]` table.
//! `MORED_STORE_*` environment variables override individual fields.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MORED_CONFIG";

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "repo";

/// Region used when none is configured. S3-compatible services ignore it.
pub const DEFAULT_REGION: &str = "auto";

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("static regex"));

/// Errors loading, saving or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("config file {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Neither `$MORED_CONFIG` nor a home directory is available.
    #[error("could not determine config location, set MORED_CONFIG")]
    NoHome,

    /// Required store fields are empty.
    #[error("store configuration is incomplete (missing {}), run `mrd store` first", .0.join(", "))]
    Incomplete(Vec<&'static str>),
}

/// Connection settings for the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Public base URL archives are served from, e.g. `https://bucket.oss.example.com`.
    pub domain: String,
    /// S3-compatible API endpoint.
    pub endpoint: String,
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Bucket name.
    pub bucket: String,
    /// Key prefix every object is stored under.
    pub prefix: String,
    /// Signing region, `auto` when empty.
    pub region: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: StoreConfig,
}

impl StoreConfig {
    /// Default config path: `$MORED_CONFIG` or `~/.config/mored/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".config").join("mored").join("config.toml"))
    }

    /// Load from `path` (or the default path) and apply environment overrides.
    ///
    /// A missing file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path().ok_or(ConfigError::NoHome)?,
        };
        let mut config = Self::load_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load only the file, without environment overrides.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::load`].
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file.store)
    }

    /// Apply `MORED_STORE_*` overrides using `lookup` to read variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 7] = [
            ("MORED_STORE_DOMAIN", &mut self.domain),
            ("MORED_STORE_ENDPOINT", &mut self.endpoint),
            ("MORED_STORE_ACCESS_KEY", &mut self.access_key),
            ("MORED_STORE_SECRET_KEY", &mut self.secret_key),
            ("MORED_STORE_BUCKET", &mut self.bucket),
            ("MORED_STORE_PREFIX", &mut self.prefix),
            ("MORED_STORE_REGION", &mut self.region),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    /// Fill `domain`, `prefix` and `region` defaults.
    ///
    /// A domain that is not an absolute http(s) URL becomes
    /// `https://<bucket>.<endpoint>`.
    pub fn with_defaults(mut self) -> Self {
        if !ABSOLUTE_URL.is_match(&self.domain) {
            let endpoint = self
                .endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            self.domain = format!("https://{}.{}", self.bucket, endpoint);
        }
        if self.prefix.is_empty() {
            self.prefix = DEFAULT_PREFIX.to_string();
        }
        if self.region.is_empty() {
            self.region = DEFAULT_REGION.to_string();
        }
        self
    }

    /// Write the config to `path`, replacing the `[store]` table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = toml::to_string_pretty(&ConfigFile {
            store: self.clone(),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Base URL dependencies default to: `<domain>/<prefix>`.
    ///
    /// Empty when no domain is configured.
    pub fn remote(&self) -> String {
        if self.domain.is_empty() {
            return String::new();
        }
        format!("{}/{}", self.domain.trim_end_matches('/'), self.prefix)
    }

    /// Check that every field needed to push is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Incomplete`] naming the empty fields.
    pub fn ensure_complete(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("endpoint", &self.endpoint),
            ("key", &self.access_key),
            ("secret", &self.secret_key),
            ("bucket", &self.bucket),
            ("prefix", &self.prefix),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Incomplete(missing))
        }
    }
}

/// Settings for one publish run.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Output directory; archives go to `<dist>/kit` and `<dist>/suite`.
    pub dist: PathBuf,
    /// Upload archives and merge the index after building.
    pub push: bool,
    /// Remote filled into dependencies that do not name one.
    pub default_remote: String,
    /// Regular expressions matched against file base names to leave out of archives.
    pub excludes: Vec<String>,
    /// Look up the public IP for the author record.
    pub lookup_ip: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            dist: PathBuf::from("dist"),
            push: false,
            default_remote: String::new(),
            excludes: Vec::new(),
            lookup_ip: true,
        }
    }
}

impl PublishConfig {
    /// Staging directory for one package kind.
    pub fn staging_dir(&self, kind: mored_schema::PackageKind) -> PathBuf {
        self.dist.join(kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn complete() -> StoreConfig {
        StoreConfig {
            endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
            access_key: "AK".to_string(),
            secret_key: "SK".to_string(),
            bucket: "mored".to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn missing_file_is_empty_config() {
        let tmp = tempdir().unwrap();
        let config = StoreConfig::load_file(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/config.toml");
        let config = complete().with_defaults();
        config.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[store]"));
        assert_eq!(StoreConfig::load_file(&path).unwrap(), config);
    }

    #[test]
    fn defaults_fill_domain_prefix_region() {
        let config = complete().with_defaults();
        assert_eq!(config.domain, "https://mored.oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(config.prefix, "repo");
        assert_eq!(config.region, "auto");
        assert_eq!(
            config.remote(),
            "https://mored.oss-cn-hangzhou.aliyuncs.com/repo"
        );
    }

    #[test]
    fn explicit_domain_is_kept() {
        let mut config = complete();
        config.domain = "https://cdn.example.com/".to_string();
        config.prefix = "kits".to_string();
        let config = config.with_defaults();
        assert_eq!(config.domain, "https://cdn.example.com/");
        assert_eq!(config.remote(), "https://cdn.example.com/kits");
    }

    #[test]
    fn env_overrides_replace_fields() {
        let env: HashMap<&str, &str> = [
            ("MORED_STORE_BUCKET", "override"),
            ("MORED_STORE_PREFIX", ""),
        ]
        .into_iter()
        .collect();
        let mut config = complete();
        config.prefix = "repo".to_string();
        config.apply_overrides(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.bucket, "override");
        assert_eq!(config.prefix, "repo");
    }

    #[test]
    fn incomplete_config_names_missing_fields() {
        let err = StoreConfig::default().ensure_complete().unwrap_err();
        match err {
            ConfigError::Incomplete(missing) => {
                assert_eq!(missing, ["endpoint", "key", "secret", "bucket", "prefix"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(complete().with_defaults().ensure_complete().is_ok());
    }

    #[test]
    fn staging_dirs_per_kind() {
        let config = PublishConfig::default();
        assert_eq!(
            config.staging_dir(mored_schema::PackageKind::Kit),
            PathBuf::from("dist/kit")
        );
        assert_eq!(
            config.staging_dir(mored_schema::PackageKind::Suite),
            PathBuf::from("dist/suite")
        );
    }
}
