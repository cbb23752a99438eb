//! ODBC access to the warehouse using [arrow-odbc](https://docs.rs/arrow-odbc).
//!
//! Every function opens its own connection, runs its statements inside a single transaction
//! and closes the connection again. All functions block, async callers should run them on a
//! blocking thread.
//!
//! ```rust,ignore
//! use sluice_odbc::execute_in_transaction;
//!
//! let connection_string = "\
//!     Driver={PostgreSQL Unicode};\
//!     Server=localhost;\
//!     UID=admin;\
//!     PWD=password;\
//!     Database=olist;\
//! ";
//!
//! execute_in_transaction(
//!     connection_string,
//!     &["CREATE TABLE silver_orders AS SELECT * FROM orders".to_string()],
//! )?;
//! ```

use std::sync::Arc;

use arrow_odbc::odbc_api::{Connection, ConnectionOptions, Environment};
use arrow_odbc::OdbcWriter;
use datafusion::arrow::array::{RecordBatch, RecordBatchIterator};
use datafusion::arrow::datatypes::Schema;
use sluice_schemas::WriteMode;
use tracing::{debug, error, warn};

pub mod ddl;
pub mod error;

pub use error::OdbcError;

pub type Result<T> = core::result::Result<T, OdbcError>;

/// Write `batches` to `table` and return the number of rows written.
///
/// With [`WriteMode::Replace`] the table is dropped and recreated from `schema`, with
/// [`WriteMode::Append`] it is created only when missing. Drop, create and insert run in one
/// transaction, a failure leaves the previous table untouched.
pub fn write_table(
    connection_string: &str,
    table: &str,
    mode: WriteMode,
    schema: Arc<Schema>,
    batches: Vec<RecordBatch>,
    batch_size: usize,
) -> Result<usize> {
    let num_rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>();

    in_transaction(connection_string, |connection| {
        match mode {
            WriteMode::Replace => {
                connection.execute(&ddl::drop_table(table), (), None)?;
                connection.execute(&ddl::create_table(table, &schema, false), (), None)?;
            }
            WriteMode::Append => {
                connection.execute(&ddl::create_table(table, &schema, true), (), None)?;
            }
        }

        if num_rows > 0 {
            let insert = ddl::insert_into(table, &schema);
            let mut writer =
                OdbcWriter::new(batch_size, &schema, connection.prepare(&insert)?)?;

            let record_batch_iterator =
                RecordBatchIterator::new(batches.into_iter().map(Ok), Arc::clone(&schema));
            writer.write_all(record_batch_iterator)?;
        }

        debug!(table, num_rows, %mode, "Wrote table");
        Ok(num_rows)
    })
}

/// Execute `statements` in order inside one transaction.
///
/// The first failing statement rolls the whole transaction back and is reported with its
/// 1-based position. Result sets produced by queries are discarded.
pub fn execute_in_transaction(connection_string: &str, statements: &[String]) -> Result<usize> {
    in_transaction(connection_string, |connection| {
        for (i, statement) in statements.iter().enumerate() {
            connection
                .execute(statement, (), None)
                .map_err(|source| OdbcError::Statement {
                    number: i + 1,
                    source,
                })?;
        }

        Ok(statements.len())
    })
}

/// Runs `f` with autocommit disabled, committing on success and rolling back on error.
fn in_transaction<T>(
    connection_string: &str,
    f: impl FnOnce(&Connection<'_>) -> Result<T>,
) -> Result<T> {
    let odbc_environment = Environment::new()?;

    let connection = odbc_environment
        .connect_with_connection_string(connection_string, ConnectionOptions::default())?;

    connection.set_autocommit(false)?;

    match f(&connection) {
        Ok(value) => {
            connection.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = connection.rollback() {
                warn!("ROLLBACK failed: {rollback_err}");
            }
            error!("ROLLBACK transaction: {err}");
            Err(err)
        }
    }
}
