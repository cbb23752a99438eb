//! Ingest, load and transform pipelines of sluice.
//!
//! - [`ingest::run_ingest`] uploads the CSV files of a local directory to an object store bucket
//! - [`load::run_load`] parses every CSV object under a prefix into its own warehouse table
//! - [`transform::run_transform`] runs the silver, data quality and gold SQL scripts in order
//!
//! Per-file work of ingest and load runs through a [`tasks::TaskRunner`] with bounded
//! concurrency and retries. Every stage returns a [`report::StageReport`] keyed by unit.

pub mod error;
pub mod ingest;
pub mod load;
pub mod progress_tracker;
pub mod report;
pub mod sql;
pub mod tasks;
pub mod transform;
pub mod warehouse;

/// Prelude module with commonly used types and functions
pub mod prelude;

pub use error::{Error, Result};
