use crate::{ingest::IngestError, load::LoadError, transform::TransformError};

use miette::Diagnostic;
use sluice_schemas::{ConfigError, PipelineStage};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(sluice::config),
        help("Check the command line flags and the environment (a .env file is loaded when present)")
    )]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(sluice::storage))]
    Storage(#[from] sluice_storage::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(Box<IngestError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(Box<LoadError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(Box<TransformError>),

    #[error("{0} is not supported by this build")]
    #[diagnostic(
        code(sluice::unsupported),
        help("Rebuild with the matching cargo feature enabled")
    )]
    Unsupported(String),

    #[error("{stage} finished with {failed} failed units")]
    #[diagnostic(
        code(sluice::stage_failed),
        help("The run summary lists the error of every failed unit")
    )]
    StageFailed { stage: PipelineStage, failed: usize },
}

impl From<IngestError> for Error {
    fn from(error: IngestError) -> Self {
        Error::Ingest(Box::new(error))
    }
}

impl From<LoadError> for Error {
    fn from(error: LoadError) -> Self {
        Error::Load(Box::new(error))
    }
}

impl From<TransformError> for Error {
    fn from(error: TransformError) -> Self {
        Error::Transform(Box::new(error))
    }
}
