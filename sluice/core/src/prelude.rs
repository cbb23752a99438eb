//! Prelude module that exports commonly used types and functions.
//!
//! This module provides a convenient way to import all the necessary
//! components with a single `use sluice_core::prelude::*;` statement.

pub use crate::{Error, Result};

// Pipelines
pub use crate::ingest::{run_ingest, IngestError, Uploaded};
pub use crate::load::{run_load, table_name, LoadError, LoadedTable};
pub use crate::transform::{run_transform, ScriptRun, TransformError};

// Execution
pub use crate::progress_tracker::{LoggingProgressTracker, ProgressTracker};
pub use crate::report::{StageReport, StageSummary, UnitStatus};
pub use crate::sql::SqlScript;
pub use crate::tasks::{Retryable, TaskRunner, WorkUnit};

// Warehouses
pub use crate::warehouse::{MemoryWarehouse, Warehouse, WarehouseError};

#[cfg(feature = "odbc")]
pub use crate::warehouse::OdbcWarehouse;
