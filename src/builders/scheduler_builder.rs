//! Assemble a [`CycleScheduler`] from a validated [`SchedulerConfig`].

use std::sync::Arc;

use crate::config::{SchedulerConfig, SchedulerOptions, TaskDefinition};
use crate::core::{CostModel, CycleScheduler, EventBridge, SchedulerError, TaskRegistry, TaskSource};

/// Build a stopped scheduler from configuration using the provided factory.
///
/// `source_factory` resolves each task definition into a [`TaskSource`]. Any
/// failure is fatal: nothing is started and no partial scheduler is returned.
///
/// # Errors
///
/// `SchedulerError::Config` for invalid configuration or unresolvable tasks.
pub fn build_scheduler<B, F>(
    cfg: &SchedulerConfig,
    bridge: Arc<B>,
    cost_model: &dyn CostModel,
    source_factory: F,
) -> Result<CycleScheduler<B>, SchedulerError>
where
    B: EventBridge + ?Sized,
    F: FnMut(&TaskDefinition) -> Result<Box<dyn TaskSource>, SchedulerError>,
{
    cfg.validate()
        .map_err(|e| SchedulerError::config(format!("config invalid: {e}")))?;

    let registry = TaskRegistry::build(&cfg.tasks, cost_model, source_factory)?;
    CycleScheduler::new(SchedulerOptions::from(cfg), registry, bridge)
}
