//! Load: CSV objects → warehouse tables, one table per object.

use miette::Diagnostic;
use sluice_formats::csv::parse_csv;
use sluice_schemas::{LoadConfig, PipelineStage};
use sluice_storage::Bucket;
use std::{collections::BTreeMap, fmt};
use tracing::{debug, info, instrument};

use crate::report::StageReport;
use crate::tasks::{Retryable, TaskRunner, WorkUnit};
use crate::warehouse::{Warehouse, WarehouseError};

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum LoadError {
    #[error("Failed to list objects under prefix '{prefix}'")]
    #[diagnostic(
        code(sluice::load::list),
        help("Check that the bucket exists and the object store is reachable, run `sluice ingest` first")
    )]
    List {
        prefix: String,
        #[source]
        source: sluice_storage::Error,
    },

    #[error("Failed to fetch object '{key}'")]
    #[diagnostic(code(sluice::load::fetch))]
    Fetch {
        key: String,
        #[source]
        source: sluice_storage::Error,
    },

    #[error("Failed to parse object '{key}' as CSV")]
    #[diagnostic(code(sluice::load::parse))]
    Parse {
        key: String,
        #[source]
        source: sluice_formats::Error,
    },

    #[error("Parsing object '{key}' did not complete")]
    #[diagnostic(code(sluice::load::task))]
    Task {
        key: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Failed to write object '{key}' to table '{table}'")]
    #[diagnostic(code(sluice::load::write))]
    Write {
        key: String,
        table: String,
        #[source]
        source: WarehouseError,
    },

    #[error("Object '{key}' does not map to a table name")]
    #[diagnostic(
        code(sluice::load::invalid_table_name),
        help("Object keys must end in a file name such as 'orders.csv'")
    )]
    InvalidTableName { key: String },

    #[error("Objects {} all map to table '{table}'", .keys.join(", "))]
    #[diagnostic(
        code(sluice::load::table_conflict),
        help("Remove or rename all but one of the objects, nothing was written to the table")
    )]
    TableConflict { table: String, keys: Vec<String> },
}

impl Retryable for LoadError {
    fn is_transient(&self) -> bool {
        match self {
            LoadError::List { source, .. } | LoadError::Fetch { source, .. } => {
                source.is_transient()
            }
            LoadError::Write { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Table name for an object key: the text after the last `/` with its last extension
/// stripped. Returns `None` when nothing is left.
///
/// ```
/// use sluice_core::load::table_name;
///
/// assert_eq!(table_name("raw/orders.csv").as_deref(), Some("orders"));
/// assert_eq!(table_name("raw/olist.orders.csv").as_deref(), Some("olist.orders"));
/// assert_eq!(table_name("raw/.csv"), None);
/// ```
pub fn table_name(key: &str) -> Option<String> {
    let base = key.rsplit('/').next().unwrap_or(key);
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => base,
    };

    (!stem.is_empty()).then(|| stem.to_string())
}

/// A table written by the load stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTable {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
}

impl fmt::Display for LoadedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table '{}' ({} rows, {} columns)",
            self.table, self.rows, self.columns
        )
    }
}

#[derive(Debug, Clone)]
enum Target {
    Table(String),
    Conflict { table: String, keys: Vec<String> },
    Invalid,
}

#[derive(Debug, Clone)]
struct LoadJob {
    key: String,
    target: Target,
}

/// Load every CSV object under the configured prefix into its own table.
///
/// Listing failures fail the stage. Everything that goes wrong for a single object (fetch,
/// parse, write, an unusable or conflicting table name) is reported for that object only.
#[instrument(skip_all, fields(bucket = bucket.name(), prefix = %config.prefix))]
pub async fn run_load(
    config: &LoadConfig,
    bucket: &Bucket,
    warehouse: &dyn Warehouse,
    runner: &TaskRunner,
) -> Result<StageReport<LoadedTable, LoadError>, LoadError> {
    info!("Loading into warehouse {}", warehouse.location());

    let keys = runner
        .retry(PipelineStage::Load, &config.prefix, || async {
            bucket
                .list_prefix(&config.prefix)
                .await
                .map_err(|source| LoadError::List {
                    prefix: config.prefix.clone(),
                    source,
                })
        })
        .await?;

    let extension = config.extension.trim_start_matches('.');
    let keys: Vec<String> = keys
        .into_iter()
        .filter(|key| has_extension(key, extension))
        .collect();

    if keys.is_empty() {
        info!(
            "No CSV objects found under {}/{}",
            bucket.name(),
            config.prefix
        );
        let report = StageReport::empty(PipelineStage::Load);
        runner.stage_completed(&report);
        return Ok(report);
    }

    info!("Found {} CSV objects: {:?}", keys.len(), keys);

    let units = plan_jobs(keys)
        .into_iter()
        .map(|job| WorkUnit::new(job.key.clone(), job))
        .collect();

    Ok(runner
        .run_all(PipelineStage::Load, units, |job| {
            load_object(bucket, warehouse, config, job)
        })
        .await)
}

fn has_extension(key: &str, extension: &str) -> bool {
    let base = key.rsplit('/').next().unwrap_or(key);
    base.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(extension))
}

/// Resolve the destination table of every key, marking keys that share a table
fn plan_jobs(keys: Vec<String>) -> Vec<LoadJob> {
    let mut by_table: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in &keys {
        if let Some(table) = table_name(key) {
            by_table.entry(table).or_default().push(key.clone());
        }
    }

    keys.into_iter()
        .map(|key| {
            let target = match table_name(&key) {
                None => Target::Invalid,
                Some(table) => match by_table.get(&table) {
                    Some(keys) if keys.len() > 1 => Target::Conflict {
                        table,
                        keys: keys.clone(),
                    },
                    _ => Target::Table(table),
                },
            };
            LoadJob { key, target }
        })
        .collect()
}

async fn load_object(
    bucket: &Bucket,
    warehouse: &dyn Warehouse,
    config: &LoadConfig,
    job: LoadJob,
) -> Result<LoadedTable, LoadError> {
    let table = match job.target {
        Target::Table(table) => table,
        Target::Conflict { table, keys } => return Err(LoadError::TableConflict { table, keys }),
        Target::Invalid => return Err(LoadError::InvalidTableName { key: job.key }),
    };

    let content = bucket
        .get(&job.key)
        .await
        .map_err(|source| LoadError::Fetch {
            key: job.key.clone(),
            source,
        })?;
    debug!("Fetched {} bytes from {}", content.len(), job.key);

    let options = config.csv.clone();
    let dataset = tokio::task::spawn_blocking(move || parse_csv(&content, &options))
        .await
        .map_err(|source| LoadError::Task {
            key: job.key.clone(),
            source,
        })?
        .map_err(|source| LoadError::Parse {
            key: job.key.clone(),
            source,
        })?;

    let columns = dataset.num_columns();
    info!(
        "Writing {} rows x {} columns to table '{table}' ({})",
        dataset.num_rows(),
        columns,
        config.write_mode
    );

    let rows = warehouse
        .write_table(&table, dataset, config.write_mode)
        .await
        .map_err(|source| LoadError::Write {
            key: job.key.clone(),
            table: table.clone(),
            source,
        })?;

    info!("Finished loading table '{table}'");
    Ok(LoadedTable {
        table,
        rows,
        columns,
    })
}
