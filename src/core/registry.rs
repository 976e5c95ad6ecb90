//! Startup-time assembly of the ordered task list and purge callbacks.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{MethodDefinition, TaskDefinition};
use crate::core::{
    CostModel, Handler, HandlerMap, PurgeTask, SchedulerError, Task, TaskFn,
};

/// Runtime counterpart of a configured [`TaskDefinition`].
///
/// A source turns each of its method definitions into a callable, supplies one
/// purge callable for its stale state, and may subscribe to inbound topics.
/// Handlers run on the bridge delivery thread, concurrently with the task
/// callables, so a source publishes inbound data through something like
/// [`crate::infra::mailbox::SnapshotMailbox`] rather than plain shared state.
pub trait TaskSource: Send + Sync {
    /// Build the callable for one method definition.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the method cannot be resolved.
    fn task(&self, method: &MethodDefinition) -> Result<TaskFn, SchedulerError>;

    /// The purge callable.
    fn purge(&self) -> TaskFn;

    /// Topic subscriptions as `(topic, handler)` pairs.
    fn subscriptions(&self) -> Vec<(String, Handler)> {
        Vec::new()
    }
}

/// Tasks ordered by descending cost, plus purge tasks and topic handlers.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    purges: Vec<PurgeTask>,
    handlers: HandlerMap,
}

impl TaskRegistry {
    /// Build a registry from ready-made tasks.
    ///
    /// Tasks are sorted most expensive first; equal costs keep their given
    /// order. Purge order is kept as given but carries no meaning.
    #[must_use]
    pub fn new(mut tasks: Vec<Task>, purges: Vec<PurgeTask>) -> Self {
        tasks.sort_by(|a, b| b.cost().cmp(&a.cost()));
        Self {
            tasks,
            purges,
            handlers: HandlerMap::new(),
        }
    }

    /// Attach topic handlers.
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerMap) -> Self {
        self.handlers = handlers;
        self
    }

    /// Resolve every definition through `factory` and estimate each method's cost.
    ///
    /// Any failure aborts the whole build.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if a source cannot be created, a method cannot
    /// be resolved or costed, or two sources subscribe to the same topic.
    pub fn build<F>(
        definitions: &[TaskDefinition],
        cost_model: &dyn CostModel,
        mut factory: F,
    ) -> Result<Self, SchedulerError>
    where
        F: FnMut(&TaskDefinition) -> Result<Box<dyn TaskSource>, SchedulerError>,
    {
        let mut tasks = Vec::new();
        let mut purges = Vec::with_capacity(definitions.len());
        let mut handlers = HandlerMap::new();

        for definition in definitions {
            let source = factory(definition).map_err(|e| prefix(&definition.name, e))?;

            for method in &definition.methods {
                let cost = cost_model.estimate(method).map_err(|e| prefix(&definition.name, e))?;
                let func = source.task(method).map_err(|e| prefix(&definition.name, e))?;
                let name: Arc<str> = format!("{}/{}", definition.name, method.name).into();
                debug!(task = %name, cost = %cost, "Registered task");
                tasks.push(Task::from_fn(name, cost, func));
            }

            purges.push(PurgeTask::from_fn(
                format!("{}/purge", definition.name),
                source.purge(),
            ));

            for (topic, handler) in source.subscriptions() {
                handlers
                    .insert(topic, handler)
                    .map_err(|e| prefix(&definition.name, e))?;
            }
        }

        let registry = Self::new(tasks, purges).with_handlers(handlers);
        info!(
            tasks = registry.tasks.len(),
            purges = registry.purges.len(),
            topics = registry.handlers.len(),
            "Task registry built"
        );
        Ok(registry)
    }

    /// Tasks in dispatch order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Purge tasks.
    #[must_use]
    pub fn purges(&self) -> &[PurgeTask] {
        &self.purges
    }

    /// Topic handlers contributed by the sources.
    #[must_use]
    pub const fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }
}

fn prefix(definition: &str, err: SchedulerError) -> SchedulerError {
    match err {
        SchedulerError::Config(msg) => SchedulerError::Config(format!("task `{definition}`: {msg}")),
        other => other,
    }
}
