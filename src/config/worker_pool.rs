//! Worker pool configuration.

use std::time::Duration;

use super::SchedulerOptions;

/// Sizing and watchdog settings for a [`crate::core::WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Stack size for each worker thread; platform default when `None`.
    pub thread_stack_size: Option<usize>,
    /// Callables running longer than this are reported as slow.
    pub slow_task_threshold: Option<Duration>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            thread_stack_size: None,
            slow_task_threshold: None,
        }
    }
}

impl WorkerPoolConfig {
    /// One worker per CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Set the slow task threshold.
    #[must_use]
    pub const fn with_slow_task_threshold(mut self, threshold: Duration) -> Self {
        self.slow_task_threshold = Some(threshold);
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }
}

impl From<&SchedulerOptions> for WorkerPoolConfig {
    fn from(options: &SchedulerOptions) -> Self {
        Self {
            worker_count: options.worker_count,
            thread_stack_size: options.thread_stack_size,
            slow_task_threshold: options.slow_task_threshold,
        }
    }
}
