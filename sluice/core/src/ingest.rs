//! Ingest: local CSV files → object store.

use bytes::Bytes;
use miette::Diagnostic;
use sluice_schemas::{IngestConfig, PipelineStage};
use sluice_storage::Bucket;
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::report::StageReport;
use crate::tasks::{Retryable, TaskRunner, WorkUnit};

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum IngestError {
    #[error("Source directory '{path}' cannot be read")]
    #[diagnostic(
        code(sluice::ingest::source_dir),
        help("Point RAW_DATA_DIR (or --source-dir) at an existing directory holding the CSV files")
    )]
    SourceDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source path '{0}' is not a directory")]
    #[diagnostic(
        code(sluice::ingest::not_a_directory),
        help("Ingest scans a single directory, point it at the directory containing the files")
    )]
    NotADirectory(String),

    #[error("Failed to read '{path}'")]
    #[diagnostic(code(sluice::ingest::read_file))]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File name of '{0}' is not valid UTF-8")]
    #[diagnostic(
        code(sluice::ingest::file_name),
        help("Object keys are built from the file name, rename the file")
    )]
    FileName(String),

    #[error("Failed to upload object '{key}'")]
    #[diagnostic(code(sluice::ingest::upload))]
    Upload {
        key: String,
        #[source]
        source: sluice_storage::Error,
    },

    #[error("Failed to ensure bucket '{bucket}' exists")]
    #[diagnostic(
        code(sluice::ingest::bucket),
        help("Check the object store endpoint and credentials (MINIO_ENDPOINT, MINIO_ACCESS_KEY, MINIO_SECRET_KEY)")
    )]
    Bucket {
        bucket: String,
        #[source]
        source: sluice_storage::Error,
    },
}

impl Retryable for IngestError {
    fn is_transient(&self) -> bool {
        match self {
            IngestError::Upload { source, .. } | IngestError::Bucket { source, .. } => {
                source.is_transient()
            }
            _ => false,
        }
    }
}

/// A file written to the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub key: String,
    pub bytes: usize,
}

impl fmt::Display for Uploaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.bytes)
    }
}

#[derive(Debug, Clone)]
struct UploadJob {
    key: Option<String>,
    path: PathBuf,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SourceFile {
    path: PathBuf,
    /// `None` when the file name is not valid UTF-8
    name: Option<String>,
}

/// Upload every CSV file of the source directory to `bucket`.
///
/// Objects are keyed `{prefix}{file name}`, re-running overwrites them. Per-file failures
/// are reported in the returned report, only an unreadable source directory or a bucket
/// that cannot be created fail the whole stage.
#[instrument(skip_all, fields(source_dir = %config.source_dir.display(), bucket = bucket.name()))]
pub async fn run_ingest(
    config: &IngestConfig,
    bucket: &Bucket,
    runner: &TaskRunner,
) -> Result<StageReport<Uploaded, IngestError>, IngestError> {
    let files = discover_files(&config.source_dir, &config.extension).await?;

    if files.is_empty() {
        info!("No CSV files found under {}", config.source_dir.display());
        let report = StageReport::empty(PipelineStage::Ingest);
        runner.stage_completed(&report);
        return Ok(report);
    }

    info!(
        "Found {} CSV files: {:?}",
        files.len(),
        files
            .iter()
            .map(|file| file.path.file_name().unwrap_or_default().to_string_lossy())
            .collect::<Vec<_>>()
    );

    runner
        .retry(PipelineStage::Ingest, bucket.name(), || async {
            bucket
                .ensure_exists()
                .await
                .map_err(|source| IngestError::Bucket {
                    bucket: bucket.name().to_string(),
                    source,
                })
        })
        .await?;

    let units = files
        .into_iter()
        .map(|SourceFile { path, name }| {
            let key = name.map(|name| config.object_key(&name));
            let unit = key.clone().unwrap_or_else(|| path.display().to_string());
            WorkUnit::new(unit, UploadJob { key, path })
        })
        .collect();

    Ok(runner
        .run_all(PipelineStage::Ingest, units, |job| upload(bucket, job))
        .await)
}

/// Regular files directly inside `dir` whose extension matches, sorted by path
async fn discover_files(dir: &Path, extension: &str) -> Result<Vec<SourceFile>, IngestError> {
    let source_dir_error = |source| IngestError::SourceDir {
        path: dir.display().to_string(),
        source,
    };

    let metadata = tokio::fs::metadata(dir).await.map_err(source_dir_error)?;
    if !metadata.is_dir() {
        return Err(IngestError::NotADirectory(dir.display().to_string()));
    }

    let extension = extension.trim_start_matches('.');
    let mut entries = tokio::fs::read_dir(dir).await.map_err(source_dir_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(source_dir_error)? {
        let path = entry.path();

        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !matches_extension {
            continue;
        }

        // follows symlinks, a link to a regular file counts as a file
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let name = entry.file_name().into_string().ok();
        files.push(SourceFile { path, name });
    }

    files.sort();
    Ok(files)
}

async fn upload(bucket: &Bucket, job: UploadJob) -> Result<Uploaded, IngestError> {
    let key = job
        .key
        .ok_or_else(|| IngestError::FileName(job.path.display().to_string()))?;

    let content = tokio::fs::read(&job.path)
        .await
        .map_err(|source| IngestError::ReadFile {
            path: job.path.display().to_string(),
            source,
        })?;
    let bytes = content.len();

    bucket
        .put(&key, Bytes::from(content))
        .await
        .map_err(|source| IngestError::Upload {
            key: key.clone(),
            source,
        })?;

    info!("Uploaded {} to {}/{}", job.path.display(), bucket.name(), key);
    Ok(Uploaded { key, bytes })
}
