//! Per-stage run reports.

use serde::Serialize;
use sluice_schemas::PipelineStage;
use std::{collections::BTreeMap, error::Error as StdError, fmt, time::Duration};

/// Outcome of one stage run, keyed by unit id (object key or script name).
#[derive(Debug)]
pub struct StageReport<T, E> {
    pub stage: PipelineStage,
    pub outcomes: BTreeMap<String, Result<T, E>>,
    /// Units that never ran because an earlier unit failed
    pub skipped: Vec<String>,
    pub duration: Duration,
}

impl<T, E> StageReport<T, E> {
    pub fn new(
        stage: PipelineStage,
        outcomes: BTreeMap<String, Result<T, E>>,
        duration: Duration,
    ) -> Self {
        Self {
            stage,
            outcomes,
            skipped: Vec::new(),
            duration,
        }
    }

    /// Report of a stage that found no work
    pub fn empty(stage: PipelineStage) -> Self {
        Self::new(stage, BTreeMap::new(), Duration::ZERO)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|r| r.is_err()).count()
    }

    /// True when no unit failed and none was skipped
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &E)> {
        self.outcomes
            .iter()
            .filter_map(|(unit, result)| result.as_ref().err().map(|err| (unit.as_str(), err)))
    }
}

impl<T, E> StageReport<T, E>
where
    T: fmt::Display,
    E: StdError,
{
    /// Serializable summary with the full error chain of every failed unit
    pub fn summary(&self) -> StageSummary {
        let units = self
            .outcomes
            .iter()
            .map(|(unit, result)| match result {
                Ok(value) => UnitSummary {
                    unit: unit.clone(),
                    status: UnitStatus::Succeeded,
                    detail: value.to_string(),
                },
                Err(err) => UnitSummary {
                    unit: unit.clone(),
                    status: UnitStatus::Failed,
                    detail: error_chain(err),
                },
            })
            .chain(self.skipped.iter().map(|unit| UnitSummary {
                unit: unit.clone(),
                status: UnitStatus::Skipped,
                detail: String::new(),
            }))
            .collect();

        StageSummary {
            stage: self.stage,
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped.len(),
            duration_ms: self.duration.as_millis() as u64,
            units,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Succeeded => write!(f, "ok"),
            UnitStatus::Failed => write!(f, "FAILED"),
            UnitStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub unit: String,
    pub status: UnitStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: PipelineStage,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub units: Vec<UnitSummary>,
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} succeeded, {} failed, {} skipped ({:.2}s)",
            self.stage,
            self.succeeded,
            self.failed,
            self.skipped,
            self.duration_ms as f64 / 1000.0
        )?;

        for unit in &self.units {
            if unit.detail.is_empty() {
                writeln!(f, "  [{}] {}", unit.status, unit.unit)?;
            } else {
                writeln!(f, "  [{}] {}: {}", unit.status, unit.unit, unit.detail)?;
            }
        }

        Ok(())
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_message = cause.to_string();
        // transparent wrappers repeat their inner message
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }

    message
}
