//! Shared work queue with a completion barrier.
//!
//! The scheduler is the only producer; the worker pool drains it. Every
//! [`WorkQueue::put`] raises an outstanding count that only
//! [`WorkQueue::task_done`] lowers, so [`WorkQueue::join`] returns once every
//! item enqueued so far has been fully processed, not merely dequeued.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::core::Job;
use crate::util::clock::Timestamp;

/// A single entry on the work queue.
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// Run `job` for the cycle started at `timestamp`.
    Run {
        /// Callable to invoke.
        job: Job,
        /// Cycle start timestamp passed to the callable.
        timestamp: Timestamp,
        /// Cycle sequence number, for logs and audit events.
        cycle: u64,
    },
    /// Ask the worker that receives it to exit.
    Shutdown,
}

/// Multi-consumer FIFO with join semantics.
pub struct WorkQueue {
    tx: Sender<WorkItem>,
    rx: Receiver<WorkItem>,
    outstanding: Mutex<usize>,
    all_done: Condvar,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            outstanding: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    /// Enqueue an item.
    ///
    /// Never fails: the queue owns both channel ends, so the channel stays
    /// connected for as long as the queue exists.
    pub fn put(&self, item: WorkItem) {
        *self.outstanding.lock() += 1;
        // Only errs once the receiver is dropped, which outlives `self.tx`
        let _ = self.tx.send(item);
    }

    /// Block until an item is available.
    #[must_use]
    pub fn get(&self) -> WorkItem {
        // Unreachable disconnect; a worker seeing it should exit like on a sentinel
        self.rx.recv().unwrap_or(WorkItem::Shutdown)
    }

    /// Mark one previously dequeued item as processed.
    ///
    /// Safe to call concurrently from every worker; the last completion wakes
    /// the joiner.
    pub fn task_done(&self) {
        let mut outstanding = self.outstanding.lock();
        if *outstanding == 0 {
            tracing::warn!("task_done called more times than items were put");
            return;
        }
        *outstanding -= 1;
        if *outstanding == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until every item put so far has been marked done.
    pub fn join(&self) {
        let mut outstanding = self.outstanding.lock();
        self.all_done.wait_while(&mut outstanding, |n| *n > 0);
    }

    /// Like [`WorkQueue::join`], bounded by `timeout`. Returns `true` if drained.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        let mut outstanding = self.outstanding.lock();
        self.all_done
            .wait_while_for(&mut outstanding, |n| *n > 0, timeout);
        *outstanding == 0
    }

    /// Items put but not yet marked done.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Items waiting to be dequeued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no item is waiting to be dequeued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Whether nothing is queued or in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0
    }
}
