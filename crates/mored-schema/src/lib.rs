//! Shared chart and index types for the mored package registry.
//!
//! Everything here is pure data plus the index merge algorithms; I/O lives
//! in `mored-core`.

pub mod chart;
pub mod hash;
pub mod index;
pub mod platform;
pub mod types;

// Re-exports
pub use chart::{Chart, Dependency, Maintainer, Metadata, archive_file_name};
pub use hash::*;
pub use index::{
    Author, ChartMap, INDEX_VERSION, Index, MAX_AUTHORS, merge_names, merge_versions,
    rotate_authors, sort_descending,
};
pub use platform::{Os, current_platform};
pub use types::*;

/// File name of the package descriptor inside a package directory.
pub const DESCRIPTOR_FILE: &str = "Mored.yaml";

/// File name of the registry index, both remotely and in `dist`.
pub const INDEX_FILE: &str = "index.yaml";

/// Entry-point script every kit directory must contain.
pub const KIT_ENTRY: &str = "kit.sh";
