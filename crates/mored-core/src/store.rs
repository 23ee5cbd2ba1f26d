//! Remote index store.
//!
//! Objects live in an S3-compatible bucket accessed through `opendal`:
//!
//! - `<prefix>/index.yaml` holds the shared [`Index`]
//! - `<prefix>/kit/<archive>` and `<prefix>/suite/<archive>` hold archives
//!
//! Fetch, merge and write are separate calls with no locking in between.
//! Two publishers running at once can overwrite each other's index update;
//! the last `put` wins.

use std::path::Path;

use mored_schema::{INDEX_FILE, Index, PackageKind};
use opendal::{ErrorKind, Operator, services};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DEFAULT_REGION, StoreConfig};

/// Errors talking to the remote store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The operator could not be built from the configuration.
    #[error("failed to initialize store: {0}")]
    Init(#[source] opendal::Error),

    /// Reading an object failed for a reason other than absence.
    #[error("failed to read {key}: {source}")]
    Read {
        /// Object key.
        key: String,
        /// Underlying error.
        source: opendal::Error,
    },

    /// Writing an object failed.
    #[error("failed to write {key}: {source}")]
    Write {
        /// Object key.
        key: String,
        /// Underlying error.
        source: opendal::Error,
    },

    /// The remote index is not a valid index document.
    #[error("failed to parse remote index {key}: {source}")]
    Decode {
        /// Object key.
        key: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The index could not be serialized.
    #[error("failed to serialize index: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// A local archive could not be read for upload.
    #[error("failed to read {}: {source}", path.display())]
    Local {
        /// Local file path.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Handle on the remote registry namespace.
#[derive(Debug, Clone)]
pub struct IndexStore {
    op: Operator,
    prefix: String,
}

impl IndexStore {
    /// Wrap an existing operator. `prefix` is trimmed of slashes.
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// Build an S3 operator from store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Init`] if the operator cannot be built.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = services::S3::default();
        builder.bucket(&config.bucket);
        builder.endpoint(&endpoint_url(&config.endpoint));
        builder.access_key_id(&config.access_key);
        builder.secret_access_key(&config.secret_key);
        builder.region(if config.region.is_empty() {
            DEFAULT_REGION
        } else {
            config.region.as_str()
        });
        let op = Operator::new(builder).map_err(StoreError::Init)?.finish();
        Ok(Self::new(op, &config.prefix))
    }

    /// In-memory store, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Init`] if the memory backend cannot be built.
    pub fn memory(prefix: &str) -> Result<Self, StoreError> {
        let op = Operator::new(services::Memory::default())
            .map_err(StoreError::Init)?
            .finish();
        Ok(Self::new(op, prefix))
    }

    /// The underlying operator.
    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn key(&self, rest: &str) -> String {
        if self.prefix.is_empty() {
            rest.to_string()
        } else {
            format!("{}/{rest}", self.prefix)
        }
    }

    /// Key of the shared index.
    pub fn index_key(&self) -> String {
        self.key(INDEX_FILE)
    }

    /// Key an archive of `kind` is uploaded to.
    pub fn artifact_key(&self, kind: PackageKind, file_name: &str) -> String {
        self.key(&format!("{}/{file_name}", kind.as_str()))
    }

    /// Fetch an object, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] for any failure other than absence.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.op.read(key).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Store an object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] on failure.
    pub async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        debug!(key, bytes = data.len(), "put");
        self.op
            .write(key, data)
            .await
            .map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })
    }

    /// Fetch the shared index, or a fresh empty one when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the fetch fails or the document is invalid.
    pub async fn load_remote(&self) -> Result<Index, StoreError> {
        let key = self.index_key();
        let Some(data) = self.get(&key).await? else {
            info!(%key, "remote index does not exist, a new index will be created");
            return Ok(Index::new());
        };
        let text = String::from_utf8_lossy(&data);
        Index::from_yaml(&text).map_err(|source| StoreError::Decode { key, source })
    }

    /// Serialize `index` and write it to the index key.
    ///
    /// Returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub async fn save(&self, index: &Index) -> Result<Vec<u8>, StoreError> {
        let data = serialize(index)?;
        self.put(&self.index_key(), data.clone()).await?;
        Ok(data)
    }

    /// Upload a local archive under the `kind` directory.
    ///
    /// Returns the key written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or written.
    pub async fn upload_artifact(&self, kind: PackageKind, path: &Path) -> Result<String, StoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| StoreError::Local {
                path: path.to_path_buf(),
                source,
            })?;
        let key = self.artifact_key(kind, &file_name);
        self.put(&key, data).await?;
        Ok(key)
    }
}

/// Serialize an index the way it is stored remotely.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if serialization fails.
pub fn serialize(index: &Index) -> Result<Vec<u8>, StoreError> {
    index
        .to_yaml()
        .map(String::into_bytes)
        .map_err(StoreError::Encode)
}

/// Endpoints are often configured as bare hosts (`oss-cn-hangzhou.aliyuncs.com`).
fn endpoint_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mored_schema::{Author, Chart};
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_are_prefixed() {
        let store = IndexStore::memory("/repo/").unwrap();
        assert_eq!(store.index_key(), "repo/index.yaml");
        assert_eq!(
            store.artifact_key(PackageKind::Suite, "deploy_1.0.0.tar.gz"),
            "repo/suite/deploy_1.0.0.tar.gz"
        );

        let bare = IndexStore::memory("").unwrap();
        assert_eq!(bare.index_key(), "index.yaml");
    }

    #[test]
    fn bare_endpoints_get_https() {
        assert_eq!(endpoint_url("oss.example.com"), "https://oss.example.com");
        assert_eq!(endpoint_url("http://localhost:9000"), "http://localhost:9000");
    }

    #[tokio::test]
    async fn missing_index_starts_empty() {
        let store = IndexStore::memory("repo").unwrap();
        let index = store.load_remote().await.unwrap();
        assert_eq!(index, Index::new());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = IndexStore::memory("repo").unwrap();
        let mut index = Index::new();
        index.insert(PackageKind::Kit, Chart::new("foo", "1.0.0"));
        index.rotate_author(Author::new("ops", "linux", ""));

        let written = store.save(&index).await.unwrap();
        assert_eq!(written, serialize(&index).unwrap());
        assert_eq!(store.load_remote().await.unwrap(), index);
    }

    #[tokio::test]
    async fn corrupt_index_is_fatal() {
        let store = IndexStore::memory("repo").unwrap();
        store
            .put(&store.index_key(), b"kits: [not, a, map]\n".to_vec())
            .await
            .unwrap();
        assert!(matches!(
            store.load_remote().await,
            Err(StoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn uploads_archive_under_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foo_1.0.0.tar.gz");
        std::fs::write(&path, b"archive").unwrap();

        let store = IndexStore::memory("repo").unwrap();
        let key = store.upload_artifact(PackageKind::Kit, &path).await.unwrap();
        assert_eq!(key, "repo/kit/foo_1.0.0.tar.gz");
        assert_eq!(store.get(&key).await.unwrap(), Some(b"archive".to_vec()));
    }
}
