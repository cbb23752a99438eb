use sluice_schemas::ProgressEvent;
use tracing::{error, info, instrument, warn};

/// A trait for handling progress events during pipeline execution.
///
/// Implement this trait to monitor stages and their work units, e.g. to forward progress
/// to an external system. Events may arrive from concurrently running units.
///
/// # Examples
///
/// ```rust
/// use sluice_core::progress_tracker::ProgressTracker;
/// use sluice_schemas::ProgressEvent;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct FailureCounter {
///     failures: AtomicUsize,
/// }
///
/// impl ProgressTracker for FailureCounter {
///     fn on_progress(&self, event: ProgressEvent) {
///         if let ProgressEvent::UnitFailed { .. } = event {
///             self.failures.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait ProgressTracker: Send + Sync {
    /// Called when a progress event occurs during pipeline execution.
    fn on_progress(&self, event: ProgressEvent);
}

/// A simple progress tracker that logs progress events using the `tracing` crate.
#[derive(Debug)]
pub struct LoggingProgressTracker;

impl ProgressTracker for LoggingProgressTracker {
    #[instrument(skip_all)]
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage, units } => {
                info!("🚀 Started {stage} ({units} units)");
            }
            ProgressEvent::UnitStarted {
                stage,
                unit,
                attempt,
            } => {
                if attempt > 1 {
                    info!("⚙️  {stage}: {unit} (attempt {attempt})");
                } else {
                    info!("⚙️  {stage}: {unit}");
                }
            }
            ProgressEvent::UnitRetrying {
                stage,
                unit,
                attempt,
                error,
            } => {
                warn!("🔁 {stage}: {unit} failed on attempt {attempt}, retrying: {error}");
            }
            ProgressEvent::UnitCompleted {
                stage,
                unit,
                duration_ms,
            } => {
                info!(
                    "✅ {stage}: {unit} (took: {:.2}s)",
                    duration_ms as f64 / 1000.0
                );
            }
            ProgressEvent::UnitFailed { stage, unit, error } => {
                error!("❗ {stage}: {unit} failed: {error}");
            }
            ProgressEvent::StageCompleted {
                stage,
                succeeded,
                failed,
                duration_ms,
            } => {
                if failed > 0 {
                    warn!(
                        "⚠️  Finished {stage} with {failed} failed and {succeeded} succeeded units (total time: {:.2}s)",
                        duration_ms as f64 / 1000.0
                    );
                } else {
                    info!(
                        "🎉 Finished {stage}, {succeeded} units succeeded (total time: {:.2}s)",
                        duration_ms as f64 / 1000.0
                    );
                }
            }
        }
    }
}
