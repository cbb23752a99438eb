//! Transform: layered SQL scripts run in order against the warehouse.

use miette::Diagnostic;
use sluice_schemas::{Layer, PipelineStage, TransformConfig};
use std::{collections::BTreeMap, fmt, time::Instant};
use tracing::{info, instrument, warn};

use crate::report::StageReport;
use crate::sql::SqlScript;
use crate::tasks::{Retryable, TaskRunner, WorkUnit};
use crate::warehouse::{Warehouse, WarehouseError};

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum TransformError {
    #[error("Failed to read SQL script '{path}'")]
    #[diagnostic(
        code(sluice::transform::read_script),
        help("Check SQL_DIR (or --sql-dir) and the configured script file names")
    )]
    ReadScript {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Statement {number} of script '{script}' failed, script rolled back: {statement}")]
    #[diagnostic(code(sluice::transform::statement))]
    Statement {
        script: String,
        number: usize,
        statement: String,
        #[source]
        source: WarehouseError,
    },

    #[error("Script '{script}' failed, script rolled back")]
    #[diagnostic(code(sluice::transform::script))]
    Script {
        script: String,
        #[source]
        source: WarehouseError,
    },
}

impl Retryable for TransformError {
    fn is_transient(&self) -> bool {
        match self {
            TransformError::Statement { source, .. } | TransformError::Script { source, .. } => {
                source.is_transient()
            }
            TransformError::ReadScript { .. } => false,
        }
    }
}

/// A script that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub layer: Layer,
    pub statements: usize,
}

impl fmt::Display for ScriptRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} layer, {} statements", self.layer, self.statements)
    }
}

#[derive(Debug, Clone)]
struct ScriptJob {
    layer: Layer,
    script: SqlScript,
}

/// Run the configured scripts one after another, each in its own transaction.
///
/// All scripts are read before the first one runs, so a missing file fails the stage without
/// touching the warehouse. The first failing script is rolled back and every later script is
/// recorded as skipped.
#[instrument(skip_all, fields(sql_dir = %config.sql_dir.display()))]
pub async fn run_transform(
    config: &TransformConfig,
    warehouse: &dyn Warehouse,
    runner: &TaskRunner,
) -> Result<StageReport<ScriptRun, TransformError>, TransformError> {
    let mut jobs = Vec::new();
    for (layer, path) in config.script_paths() {
        let script = SqlScript::read(&path)
            .await
            .map_err(|source| TransformError::ReadScript {
                path: path.display().to_string(),
                source,
            })?;
        jobs.push(ScriptJob { layer, script });
    }

    let started = Instant::now();
    runner.stage_started(PipelineStage::Transform, jobs.len());

    let mut outcomes = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut jobs = jobs.into_iter();
    let run_script = |job: ScriptJob| execute(warehouse, job);

    while let Some(job) = jobs.next() {
        let name = job.script.name();
        let unit = WorkUnit::new(name.clone(), job);

        let result = runner
            .run_one(PipelineStage::Transform, unit, &run_script)
            .await;
        let failed = result.is_err();
        outcomes.insert(name.clone(), result);

        if failed {
            skipped.extend(jobs.by_ref().map(|job| job.script.name()));
            if !skipped.is_empty() {
                warn!(
                    "Script {name} failed, skipping remaining scripts: {}",
                    skipped.join(", ")
                );
            }
            break;
        }
    }

    let mut report = StageReport::new(PipelineStage::Transform, outcomes, started.elapsed());
    report.skipped = skipped;
    runner.stage_completed(&report);

    Ok(report)
}

async fn execute(warehouse: &dyn Warehouse, job: ScriptJob) -> Result<ScriptRun, TransformError> {
    let ScriptJob { layer, script } = job;
    let name = script.name();

    info!(
        "Executing {} statements from {name} ({layer} layer)",
        script.statements.len()
    );

    let statements = warehouse
        .execute_script(&script)
        .await
        .map_err(|err| match err {
            WarehouseError::Statement { number, source } => TransformError::Statement {
                script: name.clone(),
                number,
                statement: script.statement(number).unwrap_or_default().to_string(),
                source: *source,
            },
            other => TransformError::Script {
                script: name.clone(),
                source: other,
            },
        })?;

    info!("Finished {layer} script {name}");
    Ok(ScriptRun { layer, statements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::error::DataFusionError;

    #[test]
    fn test_statement_error_names_script_and_statement() {
        let err = TransformError::Statement {
            script: "olist_gold.sql".to_string(),
            number: 2,
            statement: "SELECT * FROM missing".to_string(),
            source: WarehouseError::DataFusion(DataFusionError::Plan(
                "table 'missing' not found".to_string(),
            )),
        };

        assert_eq!(
            err.to_string(),
            "Statement 2 of script 'olist_gold.sql' failed, script rolled back: SELECT * FROM missing"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_script_run_display() {
        let run = ScriptRun {
            layer: Layer::DataQuality,
            statements: 4,
        };
        assert_eq!(run.to_string(), "data_quality layer, 4 statements");
    }
}
