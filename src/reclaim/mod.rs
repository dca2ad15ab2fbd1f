//! Post-request memory reclamation
//!
//! After every `/embed` call the request's delegate is cleaned up and
//! dropped, freed heap pages are handed back to the OS, and an attached
//! accelerator has its memory pool cleared. Every step is independent and
//! best-effort: a failing or panicking step is logged and recorded, the
//! remaining steps still run, and nothing reaches the client.

pub mod steps;

pub use steps::{AcceleratorCache, AcceleratorRuntime, HeapTrim};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ReclaimConfig;
use crate::embedding::EmbeddingDelegate;
use crate::observability::MetricsCollector;

/// Outcome of a step that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped(String),
}

/// Errors from a reclaim step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReclaimError {
    #[error("{0}")]
    Failed(String),

    #[error("step panicked: {0}")]
    Panicked(String),
}

/// A process-wide teardown step
pub trait ReclaimStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self) -> Result<StepOutcome, ReclaimError>;
}

/// Per-step results of one reclaim pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    pub completed: Vec<&'static str>,
    pub skipped: Vec<(&'static str, String)>,
    pub failed: Vec<(&'static str, ReclaimError)>,
}

impl ReclaimReport {
    fn record(&mut self, step: &'static str, result: Result<StepOutcome, ReclaimError>) {
        match result {
            Ok(StepOutcome::Completed) => {
                debug!(step, "Reclaim step completed");
                self.completed.push(step);
            }
            Ok(StepOutcome::Skipped(reason)) => {
                debug!(step, reason = %reason, "Reclaim step skipped");
                self.skipped.push((step, reason));
            }
            Err(e) => {
                warn!(step, error = %e, "Reclaim step failed");
                self.failed.push((step, e));
            }
        }
    }
}

/// Runs the teardown sequence
pub struct ResourceReclaimer {
    steps: Vec<Box<dyn ReclaimStep>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ResourceReclaimer {
    /// A reclaimer that only cleans up and drops the delegate
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            metrics: None,
        }
    }

    /// Standard step list for the given configuration
    pub fn from_config(config: &ReclaimConfig) -> Self {
        let mut reclaimer = Self::new();
        if config.trim_heap {
            reclaimer = reclaimer.with_step(HeapTrim);
        }
        if config.clear_accelerator_cache {
            reclaimer = reclaimer.with_step(AcceleratorCache::detect());
        }
        reclaimer
    }

    /// Append a process-wide step
    pub fn with_step(mut self, step: impl ReclaimStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Record passes and step failures
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step once. Never fails and never panics.
    pub fn reclaim(&self, delegate: Option<Box<dyn EmbeddingDelegate>>) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        match delegate {
            Some(mut delegate) => {
                report.record(
                    "delegate_cleanup",
                    guarded(|| {
                        delegate
                            .cleanup()
                            .map(|_| StepOutcome::Completed)
                            .map_err(|e| ReclaimError::Failed(e.to_string()))
                    }),
                );
                report.record(
                    "release_delegate",
                    guarded(move || {
                        drop(delegate);
                        Ok(StepOutcome::Completed)
                    }),
                );
            }
            None => {
                report.record("delegate_cleanup", Ok(StepOutcome::Skipped("no delegate".to_string())));
                report.record("release_delegate", Ok(StepOutcome::Skipped("no delegate".to_string())));
            }
        }

        for step in &self.steps {
            report.record(step.name(), guarded(|| step.run()));
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_reclaim(report.failed.len());
        }

        report
    }
}

impl Default for ResourceReclaimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a step inside its own panic boundary
fn guarded<F>(step: F) -> Result<StepOutcome, ReclaimError>
where
    F: FnOnce() -> Result<StepOutcome, ReclaimError>,
{
    catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ReclaimError::Panicked(message))
    })
}

/// Holds a request's delegate and runs the reclaimer exactly once when dropped,
/// whichever way the request ends.
pub struct ReclaimGuard<'a> {
    reclaimer: &'a ResourceReclaimer,
    delegate: Option<Box<dyn EmbeddingDelegate>>,
}

impl<'a> ReclaimGuard<'a> {
    pub fn new(reclaimer: &'a ResourceReclaimer) -> Self {
        Self {
            reclaimer,
            delegate: None,
        }
    }

    /// Take ownership of the delegate and lend it back
    pub fn hold(&mut self, delegate: Box<dyn EmbeddingDelegate>) -> &mut dyn EmbeddingDelegate {
        &mut **self.delegate.insert(delegate)
    }
}

impl Drop for ReclaimGuard<'_> {
    fn drop(&mut self) {
        self.reclaimer.reclaim(self.delegate.take());
    }
}
