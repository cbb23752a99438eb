//! sluice - Batch pipeline moving CSV files through an object store into a SQL warehouse
//!
//! This crate is a meta-package that re-exports the most commonly used
//! types and functions of the sluice crates.
//!
//! # Features
//!
//! - **core**: Ingest, load and transform pipelines (enabled by default)
//! - **storage**: Object store backends (enabled by default)
//! - **formats**: CSV parsing (enabled by default)
//! - **s3**: Amazon S3 and MinIO integration
//! - **odbc**: ODBC warehouse, e.g. PostgreSQL
//! - **full**: All features
//!
//! # Examples
//!
//! ```no_run
//! use sluice::prelude::*;
//!
//! # async fn run() -> sluice::Result<()> {
//! let runner = TaskRunner::new(&RunnerConfig::default());
//! let bucket = Bucket::in_memory("raw-csv");
//! let warehouse = MemoryWarehouse::new();
//!
//! let config = IngestConfig::builder()
//!     .source_dir("data/raw/olist".into())
//!     .build();
//! run_ingest(&config, &bucket, &runner).await?;
//! run_load(&LoadConfig::default(), &bucket, &warehouse, &runner).await?;
//! # Ok(())
//! # }
//! ```

pub use sluice_schemas::{self as schemas};

// Re-exports from core
#[cfg(feature = "core")]
pub use sluice_core::{self as core, prelude as core_prelude};

#[cfg(feature = "core")]
pub use sluice_core::{
    error, ingest, load,
    progress_tracker::{LoggingProgressTracker, ProgressTracker},
    report, transform, warehouse, Error, Result,
};

// Re-exports from formats
#[cfg(feature = "formats")]
pub use sluice_formats::{self as formats, prelude as formats_prelude};

// Re-exports from odbc
#[cfg(feature = "odbc")]
pub use sluice_odbc as odbc;

// Re-exports from storage
#[cfg(feature = "storage")]
pub use sluice_storage::{self as storage, prelude as storage_prelude};

/// Prelude module that exports commonly used types and functions.
///
/// This module provides a convenient way to import all the necessary
/// components with a single `use sluice::prelude::*;` statement.
pub mod prelude {
    pub use sluice_schemas::*;

    #[cfg(feature = "core")]
    pub use sluice_core::prelude::*;

    #[cfg(feature = "formats")]
    pub use sluice_formats::prelude::*;

    #[cfg(feature = "storage")]
    pub use sluice_storage::prelude::*;
}
