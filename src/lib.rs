//! # Prometheus Cycle Scheduler
//!
//! A periodic, cost-ordered fan-out scheduler backed by a fixed pool of OS
//! worker threads.
//!
//! Every cycle the scheduler captures one timestamp, hands every registered
//! task to the pool (most expensive first), waits until all of them have
//! returned, then runs every purge callback with the same timestamp, waits
//! again, and sleeps for the rest of the period. Inbound data arrives through
//! an event bridge on its own delivery thread, independent of cycle timing.
//!
//! ## Key Features
//!
//! - **Cost-Ordered Dispatch**: The most expensive tasks start first, so the
//!   slowest item is least likely to be the last one holding the barrier
//! - **Strict Phase Barriers**: No purge callback starts before every task of
//!   the same cycle has returned
//! - **Failure Isolation**: Errors and panics in a task are logged and counted;
//!   they never kill a worker or block a barrier
//! - **Drift-Free Cadence**: Sleep is `period - elapsed`; overruns start the
//!   next cycle immediately and are reported by the watchdog
//! - **Prompt, Idempotent Stop**: The inter-cycle sleep is interruptible
//! - **Bounded Startup**: Bridge readiness is awaited with a timeout
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use prometheus_cycle_scheduler::config::SchedulerOptions;
//! use prometheus_cycle_scheduler::core::{CycleScheduler, PurgeTask, Task, TaskCost, TaskRegistry};
//! use prometheus_cycle_scheduler::infra::InMemoryBridge;
//!
//! let registry = TaskRegistry::new(
//!     vec![
//!         Task::new("avg_1h", TaskCost::new(3600.0)?, |ts| { /* ... */ Ok(()) }),
//!         Task::new("avg_5min", TaskCost::new(300.0)?, |ts| { /* ... */ Ok(()) }),
//!     ],
//!     vec![PurgeTask::new("evict", |ts| { /* ... */ Ok(()) })],
//! );
//!
//! let scheduler = Arc::new(CycleScheduler::new(
//!     SchedulerOptions::new()
//!         .with_period(Duration::from_secs(60))
//!         .with_worker_count(4),
//!     registry,
//!     Arc::new(InMemoryBridge::new()),
//! )?);
//!
//! let handle = CycleScheduler::spawn(&scheduler)?;
//! // ...
//! scheduler.stop();
//! handle.join().expect("scheduler thread panicked")?;
//! ```
//!
//! Configuration-driven assembly goes through
//! [`builders::build_scheduler`], which resolves each configured task
//! definition into a [`core::TaskSource`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, queue, pool, cycle loop, bridge contract.
pub mod core;
/// Configuration models for the scheduler, workers, and task definitions.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Infrastructure adapters for bridges and mailboxes.
pub mod infra;
/// Runtime adapters (tokio) and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
