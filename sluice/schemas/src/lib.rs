//! # Sluice Schemas
//!
//! This crate contains the configuration and event types used throughout the sluice
//! crates. Keeping them here avoids circular dependencies between core, storage,
//! formats and the ODBC warehouse crate.
//!
//! Every configuration object is plain data: defaults are applied once when the object is
//! built (via the `bon` builders or serde defaults) and each component receives its
//! configuration explicitly instead of reading the environment.

pub mod csv;
pub mod error;
pub mod progress;
pub mod runner;
pub mod stages;
pub mod store;
pub mod warehouse;

mod serde_helpers;

pub use csv::{CsvOptions, CsvOptionsBuilder, InferenceMode};
pub use error::ConfigError;
pub use progress::{PipelineStage, ProgressEvent};
pub use runner::{RunnerConfig, RunnerConfigBuilder};
pub use stages::{
    IngestConfig, IngestConfigBuilder, Layer, LoadConfig, LoadConfigBuilder, TransformConfig,
    TransformConfigBuilder, TransformScript,
};
pub use store::{ObjectStoreConfig, ObjectStoreConfigBuilder, StoreBackend};
pub use warehouse::{WarehouseConfig, WarehouseConfigBuilder, WriteMode};
