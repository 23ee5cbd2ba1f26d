//! Core library for mored: descriptor validation, archiving, candidate
//! scanning, the remote index store and the publish pipeline.

pub mod attribution;
pub mod config;
pub mod descriptor;
pub mod packager;
pub mod publisher;
pub mod reporter;
pub mod scan;
pub mod store;
pub mod validate;

pub use config::{ConfigError, PublishConfig, StoreConfig};
pub use publisher::{Outcome, PublishError, PublishReport, Publisher};
pub use reporter::{NullReporter, Reporter};
pub use store::{IndexStore, StoreError};
pub use validate::{ValidatedChart, ValidationError, validate, validate_all};

/// User Agent string for outbound requests
pub const USER_AGENT: &str = concat!("mored/", env!("CARGO_PKG_VERSION"));
