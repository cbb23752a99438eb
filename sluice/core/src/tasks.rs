//! Bounded task runner for per-file work units.
//!
//! Units are independent: a failing unit never stops its siblings. Each unit runs inside a
//! `task` span carrying the stage and unit id, transient failures are retried with a fixed
//! delay.

use futures::{stream, StreamExt};
use sluice_schemas::{PipelineStage, ProgressEvent, RunnerConfig};
use std::{collections::BTreeMap, fmt, future::Future, sync::Arc, time::Duration, time::Instant};
use tracing::{info_span, warn, Instrument};

use crate::progress_tracker::ProgressTracker;
use crate::report::StageReport;

/// Errors that can tell whether another attempt may succeed
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// A unit of work identified by `id`, e.g. the object key of a file
#[derive(Debug, Clone)]
pub struct WorkUnit<U> {
    pub id: String,
    pub input: U,
}

impl<U> WorkUnit<U> {
    pub fn new(id: impl Into<String>, input: U) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }
}

/// Runs work units with bounded concurrency and retries.
#[derive(Clone)]
pub struct TaskRunner {
    concurrency: usize,
    max_retries: u32,
    retry_delay: Duration,
    progress_tracker: Option<Arc<dyn ProgressTracker>>,
}

impl TaskRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            progress_tracker: None,
        }
    }

    pub fn with_progress_tracker(mut self, tracker: Arc<dyn ProgressTracker>) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    /// Run every unit and collect the outcomes keyed by unit id.
    ///
    /// At most `concurrency` units are in flight; completion order is not preserved.
    pub async fn run_all<U, T, E, F, Fut>(
        &self,
        stage: PipelineStage,
        units: Vec<WorkUnit<U>>,
        f: F,
    ) -> StageReport<T, E>
    where
        U: Clone,
        F: Fn(U) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let started = Instant::now();
        self.stage_started(stage, units.len());

        let f = &f;
        let outcomes = stream::iter(units)
            .map(|unit| async move {
                let id = unit.id.clone();
                let result = self.run_one(stage, unit, f).await;
                (id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect::<BTreeMap<_, _>>()
            .await;

        let report = StageReport::new(stage, outcomes, started.elapsed());
        self.stage_completed(&report);
        report
    }

    /// Run a single unit with retries, reporting its progress.
    pub async fn run_one<U, T, E, F, Fut>(
        &self,
        stage: PipelineStage,
        unit: WorkUnit<U>,
        f: &F,
    ) -> Result<T, E>
    where
        U: Clone,
        F: Fn(U) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let span = info_span!("task", %stage, unit = %unit.id);
        let started = Instant::now();

        let result = self
            .attempt(stage, &unit.id, || f(unit.input.clone()))
            .instrument(span)
            .await;

        match &result {
            Ok(_) => self.emit(ProgressEvent::UnitCompleted {
                stage,
                unit: unit.id,
                duration_ms: started.elapsed().as_millis() as u64,
            }),
            Err(err) => self.emit(ProgressEvent::UnitFailed {
                stage,
                unit: unit.id,
                error: err.to_string(),
            }),
        }

        result
    }

    /// Retry `f` on transient errors without emitting unit events, for stage preconditions
    /// such as creating a bucket or listing objects.
    pub async fn retry<T, E, F, Fut>(&self, stage: PipelineStage, id: &str, f: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    warn!(%stage, id, attempt, "Transient failure, retrying: {err}");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<T, E, F, Fut>(&self, stage: PipelineStage, id: &str, f: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            self.emit(ProgressEvent::UnitStarted {
                stage,
                unit: id.to_string(),
                attempt,
            });

            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    self.emit(ProgressEvent::UnitRetrying {
                        stage,
                        unit: id.to_string(),
                        attempt,
                        error: err.to_string(),
                    });
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) fn stage_started(&self, stage: PipelineStage, units: usize) {
        self.emit(ProgressEvent::StageStarted { stage, units });
    }

    pub(crate) fn stage_completed<T, E>(&self, report: &StageReport<T, E>) {
        self.emit(ProgressEvent::StageCompleted {
            stage: report.stage,
            succeeded: report.succeeded(),
            failed: report.failed(),
            duration_ms: report.duration.as_millis() as u64,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tracker) = &self.progress_tracker {
            tracker.on_progress(event);
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("progress_tracker", &self.progress_tracker.is_some())
            .finish()
    }
}
