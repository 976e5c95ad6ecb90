//! Runtime options consumed directly by the scheduler and worker pool.

use std::time::Duration;

use super::SchedulerConfig;

/// Options controlling one scheduler instance.
///
/// Unlike [`SchedulerConfig`], this carries plain `Duration`s, so periods below
/// one second are possible when built programmatically.
///
/// ```rust,ignore
/// let options = SchedulerOptions::new()
///     .with_period(Duration::from_secs(60))
///     .with_worker_count(4)
///     .with_connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Target time between two cycle starts.
    pub period: Duration,
    /// Number of worker threads.
    pub worker_count: usize,
    /// Upper bound on the wait for bridge readiness.
    pub connect_timeout: Duration,
    /// Upper bound on the wait for bridge disconnect acknowledgement.
    pub disconnect_timeout: Duration,
    /// Consecutive overruns that trigger a warning. 0 disables the warning.
    pub overrun_warn_after: u32,
    /// Tasks running longer than this are reported as slow.
    pub slow_task_threshold: Option<Duration>,
    /// Stack size for worker threads; platform default when `None`.
    pub thread_stack_size: Option<usize>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            worker_count: num_cpus::get().max(1),
            connect_timeout: Duration::from_secs(30),
            disconnect_timeout: Duration::from_secs(10),
            overrun_warn_after: 3,
            slow_task_threshold: None,
            thread_stack_size: None,
        }
    }
}

impl SchedulerOptions {
    /// Defaults: 60s period, one worker per CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle period.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the bridge connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the bridge disconnect timeout.
    #[must_use]
    pub const fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }

    /// Set the consecutive overrun warning threshold.
    #[must_use]
    pub const fn with_overrun_warn_after(mut self, cycles: u32) -> Self {
        self.overrun_warn_after = cycles;
        self
    }

    /// Set the slow task threshold.
    #[must_use]
    pub const fn with_slow_task_threshold(mut self, threshold: Duration) -> Self {
        self.slow_task_threshold = Some(threshold);
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than 0".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            period: Duration::from_secs(cfg.update_cycle),
            worker_count: cfg.number_worker,
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            disconnect_timeout: Duration::from_secs(cfg.disconnect_timeout_secs),
            overrun_warn_after: cfg.watchdog.overrun_warn_after,
            slow_task_threshold: cfg.watchdog.slow_task_warn_ms.map(Duration::from_millis),
            thread_stack_size: None,
        }
    }
}
