//! Schedulable units of periodic work.
//!
//! A [`Task`] is built once at startup and never changes afterwards: it pairs a
//! callable with the cost estimate that decides its dispatch position. A
//! [`PurgeTask`] has the same shape minus the cost and only ever runs after
//! every task of the same cycle has returned.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{AppResult, SchedulerError};
use crate::util::clock::Timestamp;

/// Shared callable invoked with the cycle timestamp.
pub type TaskFn = Arc<dyn Fn(Timestamp) -> AppResult<()> + Send + Sync>;

/// The phase a work item belongs to within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Regular tasks, dispatched most expensive first.
    Compute,
    /// Cleanup callbacks, dispatched after the compute barrier.
    Purge,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Purge => write!(f, "purge"),
        }
    }
}

/// Estimated execution cost, used for ordering only.
///
/// Always finite and non-negative, so the ordering is total.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TaskCost(f64);

impl TaskCost {
    /// Zero cost.
    pub const ZERO: Self = Self(0.0);

    /// Validate and wrap a raw cost value.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` for NaN, infinite, or negative values.
    pub fn new(value: f64) -> Result<Self, SchedulerError> {
        if !value.is_finite() {
            return Err(SchedulerError::config(format!("cost must be finite, got {value}")));
        }
        if value < 0.0 {
            return Err(SchedulerError::config(format!("cost must not be negative, got {value}")));
        }
        // -0.0 and 0.0 must compare equal under total_cmp
        Ok(Self(if value == 0.0 { 0.0 } else { value }))
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for TaskCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TaskCost {}

impl PartialOrd for TaskCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskCost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for TaskCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dispatchable callable tagged with its name and phase.
///
/// This is what travels through the work queue; tasks and purge tasks both
/// lower into it.
#[derive(Clone)]
pub struct Job {
    name: Arc<str>,
    phase: Phase,
    func: TaskFn,
}

impl Job {
    /// Name used in logs and audit events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phase the job belongs to.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Invoke the callable.
    ///
    /// # Errors
    ///
    /// Whatever the callable returns.
    pub fn run(&self, timestamp: Timestamp) -> AppResult<()> {
        (self.func)(timestamp)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// One unit of periodic work.
#[derive(Clone)]
pub struct Task {
    name: Arc<str>,
    cost: TaskCost,
    func: TaskFn,
}

impl Task {
    /// Create a task from a closure.
    pub fn new<F>(name: impl Into<Arc<str>>, cost: TaskCost, func: F) -> Self
    where
        F: Fn(Timestamp) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::from_fn(name, cost, Arc::new(func))
    }

    /// Create a task from an already shared callable.
    pub fn from_fn(name: impl Into<Arc<str>>, cost: TaskCost, func: TaskFn) -> Self {
        Self {
            name: name.into(),
            cost,
            func,
        }
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Estimated cost.
    #[must_use]
    pub const fn cost(&self) -> TaskCost {
        self.cost
    }

    /// Lower into a dispatchable job.
    #[must_use]
    pub fn job(&self) -> Job {
        Job {
            name: Arc::clone(&self.name),
            phase: Phase::Compute,
            func: Arc::clone(&self.func),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// Cleanup callback run after all tasks of a cycle completed.
#[derive(Clone)]
pub struct PurgeTask {
    name: Arc<str>,
    func: TaskFn,
}

impl PurgeTask {
    /// Create a purge task from a closure.
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(Timestamp) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::from_fn(name, Arc::new(func))
    }

    /// Create a purge task from an already shared callable.
    pub fn from_fn(name: impl Into<Arc<str>>, func: TaskFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Purge task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower into a dispatchable job.
    #[must_use]
    pub fn job(&self) -> Job {
        Job {
            name: Arc::clone(&self.name),
            phase: Phase::Purge,
            func: Arc::clone(&self.func),
        }
    }
}

impl fmt::Debug for PurgeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeTask")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
