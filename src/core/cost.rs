//! Cost estimation for dispatch ordering.
//!
//! Costs are only compared against each other; they never feed into runtime
//! accounting. Estimation must be a pure function of the method definition so
//! that dispatch order is identical across restarts.

use crate::config::MethodDefinition;
use crate::core::{SchedulerError, TaskCost};

/// Produces a cost estimate for one configured method.
pub trait CostModel: Send + Sync {
    /// Estimate the cost of a method definition.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the definition carries no usable cost input.
    fn estimate(&self, method: &MethodDefinition) -> Result<TaskCost, SchedulerError>;
}

/// Uses the declared `cost`, falling back to the scanned window length.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredCostModel {
    samples_per_sec: f64,
}

impl Default for DeclaredCostModel {
    fn default() -> Self {
        Self { samples_per_sec: 1.0 }
    }
}

impl DeclaredCostModel {
    /// One sample per second of window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected inbound sample rate used to scale `window_secs`.
    #[must_use]
    pub const fn with_samples_per_sec(mut self, samples_per_sec: f64) -> Self {
        self.samples_per_sec = samples_per_sec;
        self
    }
}

impl CostModel for DeclaredCostModel {
    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self, method: &MethodDefinition) -> Result<TaskCost, SchedulerError> {
        let raw = match (method.cost, method.window_secs) {
            (Some(cost), _) => cost,
            (None, Some(window)) => window as f64 * self.samples_per_sec,
            (None, None) => {
                return Err(SchedulerError::config(format!(
                    "method `{}` declares neither cost nor window_secs",
                    method.name
                )))
            }
        };
        TaskCost::new(raw)
            .map_err(|e| SchedulerError::config(format!("method `{}`: {e}", method.name)))
    }
}
