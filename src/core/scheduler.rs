//! The periodic control loop.
//!
//! One cycle captures a timestamp, dispatches every task in registry order,
//! waits for all of them to return, dispatches every purge task with the same
//! timestamp, waits again, then sleeps for whatever is left of the period. Once
//! running, the sleep is the only point where a stop request is honoured; a
//! cycle that has started always runs both phases to completion.
//!
//! ```text
//! STOPPED --start()--> STARTING --bridge ready--> RUNNING --stop()--> STOPPING --> STOPPED
//!                         |                                              ^
//!                         +---------- connect timeout / stop ------------+
//! ```
//!
//! ```rust,ignore
//! let scheduler = Arc::new(CycleScheduler::new(options, registry, bridge)?);
//! let handle = CycleScheduler::spawn(&scheduler)?;
//! // ...
//! scheduler.stop();
//! handle.join().expect("scheduler thread")?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{SchedulerOptions, WorkerPoolConfig};
use crate::core::audit::{self, build_audit_event, AuditAction, SharedAuditSink};
use crate::core::{
    EventBridge, HandlerMap, Job, PoolStats, PurgeTask, SchedulerError, Signal, Task, TaskRegistry,
    WorkItem, WorkQueue, WorkerPool,
};
use crate::util::clock::{now_ms, Timestamp};

/// Granularity at which a stop request interrupts the wait for the bridge.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lifecycle state of a [`CycleScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Not running; `start()` is allowed.
    Stopped,
    /// Workers spawned, waiting for the bridge.
    Starting,
    /// Cycle loop active.
    Running,
    /// Tearing down the bridge and the workers.
    Stopping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Cycle timing statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Cycles that ran both phases to completion.
    pub cycles_completed: u64,
    /// Timestamp of the most recent cycle start (ms since epoch).
    pub last_cycle_started_ms: u64,
    /// Duration of the most recent completed cycle.
    pub last_cycle_duration_ms: u64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
    /// Overruns in a row up to the most recent cycle.
    pub consecutive_overruns: u64,
}

#[derive(Debug, Default)]
struct CycleCounters {
    next_cycle: AtomicU64,
    cycles_completed: AtomicU64,
    last_cycle_started_ms: AtomicU64,
    last_cycle_duration_ms: AtomicU64,
    overruns: AtomicU64,
    consecutive_overruns: AtomicU64,
}

impl CycleCounters {
    fn snapshot(&self) -> CycleStats {
        CycleStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            last_cycle_started_ms: self.last_cycle_started_ms.load(Ordering::Relaxed),
            last_cycle_duration_ms: self.last_cycle_duration_ms.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            consecutive_overruns: self.consecutive_overruns.load(Ordering::Relaxed),
        }
    }
}

/// Periodic scheduler fanning tasks out to a worker pool.
///
/// Every instance owns its task list, queue, and pool; nothing is shared
/// between instances. The scheduler is restartable: each `start()` builds a
/// fresh queue and pool.
pub struct CycleScheduler<B: EventBridge + ?Sized> {
    options: SchedulerOptions,
    registry: TaskRegistry,
    handlers: Arc<HandlerMap>,
    bridge: Arc<B>,
    state: Mutex<SchedulerState>,
    state_changed: Condvar,
    stop_requested: Signal,
    stopped: Signal,
    counters: CycleCounters,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    last_pool_stats: Mutex<PoolStats>,
    run_id: Mutex<Option<Uuid>>,
    audit: Option<SharedAuditSink>,
}

impl<B: EventBridge + ?Sized> CycleScheduler<B> {
    /// Create a stopped scheduler.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if `options` are invalid.
    pub fn new(
        options: SchedulerOptions,
        registry: TaskRegistry,
        bridge: Arc<B>,
    ) -> Result<Self, SchedulerError> {
        options.validate().map_err(SchedulerError::Config)?;
        let handlers = Arc::new(registry.handlers().clone());
        Ok(Self {
            options,
            registry,
            handlers,
            bridge,
            state: Mutex::new(SchedulerState::Stopped),
            state_changed: Condvar::new(),
            stop_requested: Signal::new(),
            stopped: Signal::new_set(),
            counters: CycleCounters::default(),
            pool: Mutex::new(None),
            last_pool_stats: Mutex::new(PoolStats::default()),
            run_id: Mutex::new(None),
            audit: None,
        })
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run the scheduler on the calling thread until [`CycleScheduler::stop`].
    ///
    /// Returns once teardown has completed and the state is back to
    /// [`SchedulerState::Stopped`].
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyRunning` if the scheduler is not stopped
    /// - `SchedulerError::Spawn` if the worker pool cannot be created
    /// - `SchedulerError::ConnectTimeout` if the bridge does not become ready
    /// - `SchedulerError::Bridge` if the bridge refuses to connect
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.begin()?;
        self.run()
    }

    /// Run [`CycleScheduler::start`] on a dedicated scheduler thread.
    ///
    /// The scheduler is already [`SchedulerState::Starting`] when this
    /// returns, so a `stop()` issued right afterwards is never lost.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyRunning` if the scheduler is not stopped
    /// - `SchedulerError::Spawn` if the thread cannot be created
    pub fn spawn(this: &Arc<Self>) -> Result<JoinHandle<Result<(), SchedulerError>>, SchedulerError>
    where
        B: 'static,
    {
        this.begin()?;
        let scheduler = Arc::clone(this);
        thread::Builder::new()
            .name("cycle-scheduler".into())
            .spawn(move || scheduler.run())
            .map_err(|e| {
                error!(error = %e, "Failed to spawn scheduler thread");
                this.set_state(SchedulerState::Stopped);
                this.stopped.set();
                SchedulerError::Spawn(e.to_string())
            })
    }

    /// Request a stop. Never blocks; a no-op when already stopped.
    ///
    /// The loop notices the request at its next sleep point, so a cycle in
    /// progress still completes both phases first. During startup the request
    /// cuts the wait for the bridge short.
    pub fn stop(&self) {
        let state = self.state.lock();
        let current = *state;
        if current == SchedulerState::Stopped {
            debug!("Stop requested while already stopped");
            return;
        }
        info!(state = %current, "Stop requested");
        // Raised under the state lock so a concurrent begin() cannot clear it
        self.stop_requested.set();
    }

    /// Block until the scheduler is stopped or `timeout` elapses.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.stopped.wait_timeout(timeout)
    }

    /// Block until the scheduler reaches `target` or `timeout` elapses.
    pub fn wait_for_state(&self, target: SchedulerState, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if *state != target {
            self.state_changed
                .wait_while_for(&mut state, |s| *s != target, timeout);
        }
        *state == target
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Cycle statistics.
    #[must_use]
    pub fn stats(&self) -> CycleStats {
        self.counters.snapshot()
    }

    /// Statistics of the live pool, or of the last pool once stopped.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        if let Some(pool) = self.pool.lock().as_ref() {
            return pool.stats();
        }
        self.last_pool_stats.lock().clone()
    }

    /// Identifier of the current or most recent run.
    #[must_use]
    pub fn run_id(&self) -> Option<Uuid> {
        *self.run_id.lock()
    }

    /// Options this scheduler was built with.
    #[must_use]
    pub const fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// The task registry.
    #[must_use]
    pub const fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// The event bridge.
    #[must_use]
    pub const fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    /// Claim the STOPPED -> STARTING transition for a new run.
    fn begin(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        if *state != SchedulerState::Stopped {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.stop_requested.clear();
        self.stopped.clear();
        self.counters.consecutive_overruns.store(0, Ordering::Relaxed);
        *state = SchedulerState::Starting;
        self.state_changed.notify_all();
        Ok(())
    }

    /// Body of a run, entered in [`SchedulerState::Starting`].
    fn run(&self) -> Result<(), SchedulerError> {
        let run_id = Uuid::new_v4();
        *self.run_id.lock() = Some(run_id);
        let span = info_span!("scheduler_run", run_id = %run_id);
        let _guard = span.enter();
        info!(
            worker_count = self.options.worker_count,
            period_ms = %self.options.period.as_millis(),
            tasks = self.registry.tasks().len(),
            purges = self.registry.purges().len(),
            "Scheduler starting"
        );

        let queue = Arc::new(WorkQueue::new());
        let pool = match self.spawn_pool(run_id, Arc::clone(&queue)) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                error!(error = %e, "Failed to start worker pool");
                self.finish(run_id);
                return Err(e);
            }
        };
        *self.pool.lock() = Some(Arc::clone(&pool));

        let session = self.bridge.connect(Arc::clone(&self.handlers));
        let session_open = session.is_ok();
        let result = session.and_then(|()| self.await_ready_and_run(run_id, &queue));
        if let Err(e) = &result {
            error!(error = %e, "Scheduler run aborted");
        }

        self.teardown(&pool, session_open);
        self.finish(run_id);
        result
    }

    fn spawn_pool(&self, run_id: Uuid, queue: Arc<WorkQueue>) -> Result<WorkerPool, SchedulerError> {
        let config = WorkerPoolConfig::from(&self.options);
        match &self.audit {
            Some(audit) => WorkerPool::with_audit(config, queue, run_id, Arc::clone(audit)),
            None => WorkerPool::new(config, queue),
        }
    }

    fn await_ready_and_run(&self, run_id: Uuid, queue: &WorkQueue) -> Result<(), SchedulerError> {
        if !self.await_bridge()? {
            info!("Stop requested during startup, skipping cycle loop");
            return Ok(());
        }

        self.set_state(SchedulerState::Running);
        audit::record(self.audit.as_ref(), || {
            build_audit_event(run_id, None, None, AuditAction::RunStarted, None)
        });
        self.cycle_loop(run_id, queue);
        Ok(())
    }

    /// Wait for bridge readiness, giving up early on a stop request.
    ///
    /// Returns `false` if a stop was requested before the cycle loop began.
    fn await_bridge(&self) -> Result<bool, SchedulerError> {
        let timeout = self.options.connect_timeout;
        let ready = self.bridge.is_connected();
        let started = Instant::now();
        loop {
            if self.stop_requested.is_set() {
                return Ok(false);
            }
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(SchedulerError::ConnectTimeout(timeout));
            }
            if ready.wait_timeout(remaining.min(STARTUP_POLL_INTERVAL)) {
                return Ok(!self.stop_requested.is_set());
            }
        }
    }

    fn cycle_loop(&self, run_id: Uuid, queue: &WorkQueue) {
        let period = self.options.period;
        let mut consecutive_overruns: u32 = 0;

        loop {
            let cycle = self.counters.next_cycle.fetch_add(1, Ordering::Relaxed);
            let started = Instant::now();
            let timestamp = now_ms();
            self.counters
                .last_cycle_started_ms
                .store(u64::try_from(timestamp).unwrap_or(u64::MAX), Ordering::Relaxed);
            debug!(cycle = cycle, timestamp = %timestamp, "Cycle started");

            Self::run_phase(queue, self.registry.tasks().iter().map(Task::job), timestamp, cycle);
            Self::run_phase(queue, self.registry.purges().iter().map(PurgeTask::job), timestamp, cycle);

            let elapsed = started.elapsed();
            let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            self.counters.cycles_completed.fetch_add(1, Ordering::Relaxed);
            self.counters.last_cycle_duration_ms.store(elapsed_ms, Ordering::Relaxed);

            if !period.is_zero() && elapsed > period {
                consecutive_overruns = consecutive_overruns.saturating_add(1);
                self.record_overrun(run_id, cycle, elapsed_ms, consecutive_overruns);
            } else {
                consecutive_overruns = 0;
                self.counters.consecutive_overruns.store(0, Ordering::Relaxed);
            }

            let sleep_for = period.saturating_sub(elapsed);
            debug!(cycle = cycle, elapsed_ms = elapsed_ms, sleep_ms = %sleep_for.as_millis(), "Cycle finished");
            if self.stop_requested.wait_timeout(sleep_for) {
                info!(cycle = cycle, "Leaving cycle loop");
                return;
            }
        }
    }

    /// Enqueue one phase and wait for its barrier.
    fn run_phase(queue: &WorkQueue, jobs: impl Iterator<Item = Job>, timestamp: Timestamp, cycle: u64) {
        debug_assert!(queue.is_idle(), "work queue must be drained between phases");
        for job in jobs {
            queue.put(WorkItem::Run { job, timestamp, cycle });
        }
        queue.join();
    }

    fn record_overrun(&self, run_id: Uuid, cycle: u64, elapsed_ms: u64, consecutive: u32) {
        self.counters.overruns.fetch_add(1, Ordering::Relaxed);
        self.counters
            .consecutive_overruns
            .store(u64::from(consecutive), Ordering::Relaxed);

        let threshold = self.options.overrun_warn_after;
        if threshold > 0 && consecutive >= threshold {
            warn!(
                cycle = cycle,
                elapsed_ms = elapsed_ms,
                period_ms = %self.options.period.as_millis(),
                consecutive = consecutive,
                "Cycles keep overrunning the period"
            );
        } else {
            debug!(cycle = cycle, elapsed_ms = elapsed_ms, "Cycle overran the period");
        }
        audit::record(self.audit.as_ref(), || {
            build_audit_event(
                run_id,
                Some(cycle),
                None,
                AuditAction::CycleOverrun,
                Some(format!("{elapsed_ms}ms, {consecutive} in a row")),
            )
        });
    }

    fn teardown(&self, pool: &WorkerPool, session_open: bool) {
        self.set_state(SchedulerState::Stopping);

        if !session_open {
            debug!("Bridge session was never opened, skipping disconnect");
        } else if let Err(e) = self.bridge.disconnect() {
            warn!(error = %e, "Bridge disconnect failed");
        } else if !self
            .bridge
            .is_disconnected()
            .wait_timeout(self.options.disconnect_timeout)
        {
            warn!(
                timeout_ms = %self.options.disconnect_timeout.as_millis(),
                "Bridge did not acknowledge disconnect, continuing teardown"
            );
        }

        pool.stop();
        *self.last_pool_stats.lock() = pool.stats();
    }

    fn finish(&self, run_id: Uuid) {
        *self.pool.lock() = None;
        audit::record(self.audit.as_ref(), || {
            build_audit_event(run_id, None, None, AuditAction::RunStopped, None)
        });
        self.set_state(SchedulerState::Stopped);
        self.stopped.set();
        info!("Scheduler stopped");
    }

    fn set_state(&self, next: SchedulerState) {
        let mut state = self.state.lock();
        let previous = *state;
        debug!(from = %previous, to = %next, "Scheduler state change");
        *state = next;
        self.state_changed.notify_all();
    }
}

impl<B: EventBridge + ?Sized> fmt::Debug for CycleScheduler<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleScheduler")
            .field("state", &self.state())
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
