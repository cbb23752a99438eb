use thiserror::Error;

/// Error types for ODBC operations with security-conscious error messages.
///
/// IMPORTANT: This type never includes connection strings or other sensitive
/// information in error messages to prevent password leakage.
#[derive(Error, Debug)]
pub enum OdbcError {
    #[error(transparent)]
    Writer(#[from] arrow_odbc::WriterError),

    #[error(transparent)]
    OdbcApi(#[from] arrow_odbc::odbc_api::Error),

    #[error(transparent)]
    Arrow(#[from] datafusion::arrow::error::ArrowError),

    /// A statement of a script failed, `number` is 1-based
    #[error("statement {number} failed: {source}")]
    Statement {
        number: usize,
        #[source]
        source: arrow_odbc::odbc_api::Error,
    },
}

impl OdbcError {
    /// Connection exceptions (SQLSTATE class `08`) may succeed on a new connection
    pub fn is_transient(&self) -> bool {
        match self {
            OdbcError::OdbcApi(err) | OdbcError::Statement { source: err, .. } => {
                is_connection_exception(err)
            }
            _ => false,
        }
    }

    /// SQLSTATE reported by the driver, if any
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            OdbcError::OdbcApi(err) | OdbcError::Statement { source: err, .. } => sqlstate(err),
            _ => None,
        }
    }
}

fn sqlstate(err: &arrow_odbc::odbc_api::Error) -> Option<String> {
    match err {
        arrow_odbc::odbc_api::Error::Diagnostics { record, .. } => {
            Some(record.state.as_str().to_string())
        }
        _ => None,
    }
}

fn is_connection_exception(err: &arrow_odbc::odbc_api::Error) -> bool {
    sqlstate(err).is_some_and(|state| state.starts_with("08"))
}
