use thiserror::Error;

/// Errors raised while validating configuration.
///
/// None of the variants carry passwords or full connection strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bucket name cannot be empty")]
    EmptyBucket,

    #[error("bucket name '{0}' must not contain '/'")]
    InvalidBucket(String),

    #[error("invalid object store endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("both an access key and a secret key are required, only one was provided")]
    PartialCredentials,

    #[error("object store access key and secret key cannot be empty")]
    EmptyCredentials,

    #[error("warehouse host cannot be empty")]
    EmptyHost,

    #[error("warehouse port must be greater than 0")]
    InvalidPort,

    #[error("warehouse database name cannot be empty")]
    EmptyDatabase,

    #[error("warehouse user cannot be empty")]
    EmptyUser,

    #[error("invalid warehouse url: {0}")]
    InvalidWarehouseUrl(String),

    #[error("unsupported warehouse url scheme '{0}', expected postgres or postgresql")]
    UnsupportedScheme(String),

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("file extension cannot be empty")]
    EmptyExtension,

    #[error("no transform scripts configured")]
    NoScripts,

    #[error("transform script for layer '{0}' has an empty file name")]
    EmptyScriptName(String),

    #[error("delimiter and quote characters must be single-byte ASCII, got '{0}'")]
    NonAsciiCsvChar(char),
}
