use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("CSV data is empty")]
    Empty,

    #[error("Arrow error: {0}")]
    Arrow(#[from] datafusion::arrow::error::ArrowError),

    #[error("Invalid CSV options: {0}")]
    InvalidOptions(#[from] sluice_schemas::ConfigError),
}
