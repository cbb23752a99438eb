//! Relational warehouse abstraction.
//!
//! A [`Warehouse`] accepts whole datasets as tables and runs SQL scripts transactionally.
//! Two implementations exist:
//!
//! - [`MemoryWarehouse`]: DataFusion backed, used for tests and local dry runs
//! - `OdbcWarehouse` (with the "odbc" feature): PostgreSQL or any other ODBC data source

use async_trait::async_trait;
use sluice_formats::Dataset;
use sluice_schemas::WriteMode;
use std::fmt;

use crate::sql::SqlScript;

mod memory;
pub use memory::MemoryWarehouse;

#[cfg(feature = "odbc")]
mod odbc;
#[cfg(feature = "odbc")]
pub use odbc::OdbcWarehouse;

/// Errors raised by warehouse operations.
///
/// Messages never contain connection strings or passwords.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// A script statement failed, `number` is 1-based
    #[error("statement {number} failed: {source}")]
    Statement {
        number: usize,
        #[source]
        source: Box<WarehouseError>,
    },

    #[cfg(feature = "odbc")]
    #[error(transparent)]
    Odbc(#[from] sluice_odbc::OdbcError),

    #[error(transparent)]
    DataFusion(#[from] datafusion::error::DataFusionError),

    #[error("warehouse task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("schema of table '{table}' does not match the appended dataset")]
    SchemaMismatch { table: String },

    #[error("cannot replace table '{table}', views {} depend on it", .views.join(", "))]
    DependentViews { table: String, views: Vec<String> },
}

impl WarehouseError {
    /// Whether the same operation may succeed on a new connection
    pub fn is_transient(&self) -> bool {
        match self {
            WarehouseError::Statement { source, .. } => source.is_transient(),
            #[cfg(feature = "odbc")]
            WarehouseError::Odbc(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Destination of loaded datasets and target of transform scripts.
///
/// Implementations acquire their own connection per call and are shared between
/// concurrently running load units.
#[async_trait]
pub trait Warehouse: Send + Sync + fmt::Debug {
    /// Human readable location, safe for logs
    fn location(&self) -> String;

    /// Write `dataset` to `table` and return the number of rows written.
    async fn write_table(
        &self,
        table: &str,
        dataset: Dataset,
        mode: WriteMode,
    ) -> Result<usize, WarehouseError>;

    /// Run all statements of `script` in one transaction and return how many ran.
    ///
    /// On failure none of the script's effects remain and the error is a
    /// [`WarehouseError::Statement`] naming the failing statement when one can be attributed.
    async fn execute_script(&self, script: &SqlScript) -> Result<usize, WarehouseError>;
}
