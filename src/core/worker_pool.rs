//! Fixed-size pool of OS worker threads draining a [`WorkQueue`].
//!
//! Each worker blocks on the queue, runs the dequeued job with its cycle
//! timestamp, and marks the item done. A job that returns an error or panics
//! is logged and counted, and the item is still marked done: a failing task
//! can neither kill its worker nor hold a phase barrier shut.
//!
//! Workers exit when they dequeue [`WorkItem::Shutdown`]; [`WorkerPool::stop`]
//! enqueues one per worker and joins them all.
//!
//! ```rust,ignore
//! let queue = Arc::new(WorkQueue::new());
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4), Arc::clone(&queue))?;
//!
//! queue.put(WorkItem::Run { job: task.job(), timestamp: now_ms(), cycle: 0 });
//! queue.join();
//! pool.stop();
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerPoolConfig;
use crate::core::audit::{self, build_audit_event, AuditAction, SharedAuditSink};
use crate::core::{Job, SchedulerError, WorkItem, WorkQueue};
use crate::util::clock::Timestamp;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs currently executing.
    pub active_tasks: u64,
    /// Jobs that ran to completion, whatever their outcome.
    pub processed_tasks: u64,
    /// Jobs that returned `Ok`.
    pub completed_tasks: u64,
    /// Jobs that returned an error.
    pub failed_tasks: u64,
    /// Jobs that panicked.
    pub panicked_tasks: u64,
    /// Jobs that exceeded the slow task threshold.
    pub slow_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub processed_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub panicked_tasks: AtomicU64,
    pub slow_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            processed_tasks: self.processed_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
            slow_tasks: self.slow_tasks.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every worker of one pool.
struct WorkerContext {
    queue: Arc<WorkQueue>,
    counters: Arc<PoolCounters>,
    slow_task_threshold: Option<Duration>,
    run_id: Uuid,
    audit: Option<SharedAuditSink>,
}

/// Worker pool with dedicated OS threads.
pub struct WorkerPool {
    queue: Arc<WorkQueue>,
    counters: Arc<PoolCounters>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    stopped: AtomicBool,
}

impl WorkerPool {
    /// Spawn `config.worker_count` workers draining `queue`.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Config` if the configuration is invalid
    /// - `SchedulerError::Spawn` if a thread cannot be created; workers
    ///   spawned before the failure are stopped first
    pub fn new(config: WorkerPoolConfig, queue: Arc<WorkQueue>) -> Result<Self, SchedulerError> {
        Self::spawn_all(&config, queue, Uuid::nil(), None)
    }

    /// Like [`WorkerPool::new`], reporting task failures to an audit sink.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::new`].
    pub fn with_audit(
        config: WorkerPoolConfig,
        queue: Arc<WorkQueue>,
        run_id: Uuid,
        audit: SharedAuditSink,
    ) -> Result<Self, SchedulerError> {
        Self::spawn_all(&config, queue, run_id, Some(audit))
    }

    fn spawn_all(
        config: &WorkerPoolConfig,
        queue: Arc<WorkQueue>,
        run_id: Uuid,
        audit: Option<SharedAuditSink>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;

        let counters = Arc::new(PoolCounters::default());
        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            counters: Arc::clone(&counters),
            slow_task_threshold: config.slow_task_threshold,
            run_id,
            audit,
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            match spawn_worker(worker_id, Arc::clone(&ctx), config.thread_stack_size) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to spawn worker thread");
                    shutdown_workers(&queue, workers);
                    return Err(SchedulerError::Spawn(e.to_string()));
                }
            }
        }

        info!(worker_count = config.worker_count, "WorkerPool started");

        Ok(Self {
            queue,
            counters,
            workers: Mutex::new(workers),
            worker_count: config.worker_count,
            stopped: AtomicBool::new(false),
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.worker_count)
    }

    /// Enqueue one shutdown sentinel per worker and join every worker.
    ///
    /// Only call once no further work will be produced. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Stopping worker pool");
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        shutdown_workers(&self.queue, workers);
        info!(worker_count = self.worker_count, "Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal but don't join; explicit stop() is required for graceful cleanup
        if !self.stopped.swap(true, Ordering::AcqRel) {
            for _ in 0..self.worker_count {
                self.queue.put(WorkItem::Shutdown);
            }
            debug!("WorkerPool dropped without explicit stop - workers will be detached");
        }
    }
}

fn shutdown_workers(queue: &WorkQueue, workers: Vec<JoinHandle<()>>) {
    for _ in 0..workers.len() {
        queue.put(WorkItem::Shutdown);
    }
    for (worker_id, worker) in workers.into_iter().enumerate() {
        if worker.join().is_err() {
            warn!(worker_id = worker_id, "Worker thread panicked");
        } else {
            debug!(worker_id = worker_id, "Worker joined");
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    ctx: Arc<WorkerContext>,
    stack_size: Option<usize>,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("cycle-worker-{worker_id}"));
    if let Some(stack_size) = stack_size {
        builder = builder.stack_size(stack_size);
    }
    builder.spawn(move || worker_loop(worker_id, &ctx))
}

fn worker_loop(worker_id: usize, ctx: &WorkerContext) {
    debug!(worker_id = worker_id, "Worker thread started");

    loop {
        match ctx.queue.get() {
            WorkItem::Shutdown => {
                ctx.queue.task_done();
                break;
            }
            WorkItem::Run { job, timestamp, cycle } => {
                ctx.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
                run_job(worker_id, ctx, &job, timestamp, cycle);
                ctx.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
                ctx.counters.processed_tasks.fetch_add(1, Ordering::Relaxed);
                ctx.queue.task_done();
            }
        }
    }

    debug!(worker_id = worker_id, "Worker thread exiting");
}

fn run_job(worker_id: usize, ctx: &WorkerContext, job: &Job, timestamp: Timestamp, cycle: u64) {
    debug!(
        worker_id = worker_id,
        task = job.name(),
        phase = %job.phase(),
        cycle = cycle,
        "Worker executing job"
    );

    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(timestamp)));
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(())) => {
            ctx.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            ctx.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
            error!(
                worker_id = worker_id,
                task = job.name(),
                phase = %job.phase(),
                cycle = cycle,
                error = %format!("{e:#}"),
                "Task failed"
            );
            audit::record(ctx.audit.as_ref(), || {
                build_audit_event(
                    ctx.run_id,
                    Some(cycle),
                    Some(job.name()),
                    AuditAction::TaskFailed,
                    Some(format!("{e:#}")),
                )
            });
        }
        Err(payload) => {
            ctx.counters.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            let message = panic_message(payload.as_ref());
            error!(
                worker_id = worker_id,
                task = job.name(),
                phase = %job.phase(),
                cycle = cycle,
                panic = %message,
                "Task panicked"
            );
            audit::record(ctx.audit.as_ref(), || {
                build_audit_event(
                    ctx.run_id,
                    Some(cycle),
                    Some(job.name()),
                    AuditAction::TaskPanicked,
                    Some(message.clone()),
                )
            });
        }
    }

    if let Some(threshold) = ctx.slow_task_threshold {
        if elapsed > threshold {
            ctx.counters.slow_tasks.fetch_add(1, Ordering::Relaxed);
            let elapsed_ms = elapsed.as_millis();
            warn!(
                worker_id = worker_id,
                task = job.name(),
                cycle = cycle,
                elapsed_ms = %elapsed_ms,
                threshold_ms = %threshold.as_millis(),
                "Slow task"
            );
            audit::record(ctx.audit.as_ref(), || {
                build_audit_event(
                    ctx.run_id,
                    Some(cycle),
                    Some(job.name()),
                    AuditAction::SlowTask,
                    Some(format!("{elapsed_ms}ms")),
                )
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}
