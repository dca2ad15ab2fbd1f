//! Process-wide reclaim steps

use std::sync::Arc;
use tracing::debug;

use super::{ReclaimError, ReclaimStep, StepOutcome};

/// Hands freed heap pages back to the OS (glibc `malloc_trim`)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapTrim;

impl ReclaimStep for HeapTrim {
    fn name(&self) -> &'static str {
        "heap_trim"
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn run(&self) -> Result<StepOutcome, ReclaimError> {
        // SAFETY: malloc_trim only walks allocator-internal free lists.
        let released = unsafe { libc::malloc_trim(0) };
        debug!(released = released != 0, "malloc_trim finished");
        Ok(StepOutcome::Completed)
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn run(&self) -> Result<StepOutcome, ReclaimError> {
        Ok(StepOutcome::Skipped("allocator trimming unsupported on this platform".to_string()))
    }
}

/// An accelerator whose cached memory pool can be released
pub trait AcceleratorRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Whether a device is present and usable right now
    fn is_available(&self) -> bool;

    /// Release cached but unused device memory
    fn empty_cache(&self) -> Result<(), ReclaimError>;
}

/// Clears the accelerator memory pool when a runtime is attached and available
#[derive(Clone, Default)]
pub struct AcceleratorCache {
    runtime: Option<Arc<dyn AcceleratorRuntime>>,
}

impl AcceleratorCache {
    /// Runtime linked into this build, if any.
    ///
    /// Inference runs on the ONNX Runtime CPU provider, which keeps no device
    /// pool, so the default build attaches nothing and the step is skipped.
    pub fn detect() -> Self {
        Self::default()
    }

    pub fn with_runtime(runtime: Arc<dyn AcceleratorRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }
}

impl ReclaimStep for AcceleratorCache {
    fn name(&self) -> &'static str {
        "accelerator_cache"
    }

    fn run(&self) -> Result<StepOutcome, ReclaimError> {
        let Some(runtime) = &self.runtime else {
            return Ok(StepOutcome::Skipped("no accelerator runtime".to_string()));
        };

        if !runtime.is_available() {
            return Ok(StepOutcome::Skipped(format!("{} device unavailable", runtime.name())));
        }

        runtime.empty_cache()?;
        debug!(runtime = runtime.name(), "Accelerator cache cleared");
        Ok(StepOutcome::Completed)
    }
}
