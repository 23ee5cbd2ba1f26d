//! Reading `Mored.yaml` package descriptors.

use std::fs;
use std::path::{Path, PathBuf};

use mored_schema::{Chart, DESCRIPTOR_FILE};
use thiserror::Error;

/// Errors that can occur when loading a package descriptor.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The directory has no descriptor file.
    #[error("{} not found", .0.display())]
    Missing(PathBuf),

    /// The descriptor exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The descriptor is not a well-formed chart document.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}

/// Location of the descriptor inside a package directory.
pub fn descriptor_path(dir: &Path) -> PathBuf {
    dir.join(DESCRIPTOR_FILE)
}

/// Read and parse the descriptor of the package in `dir`.
///
/// # Errors
///
/// Returns [`DescriptorError`] if the file is missing, unreadable or not a
/// valid chart document.
pub fn read_chart(dir: &Path) -> Result<Chart, DescriptorError> {
    parse(&descriptor_path(dir))
}

/// Read and parse a descriptor file.
///
/// # Errors
///
/// See [`read_chart`].
pub fn parse(path: &Path) -> Result<Chart, DescriptorError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DescriptorError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(DescriptorError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Chart::from_yaml(&content).map_err(|source| DescriptorError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
