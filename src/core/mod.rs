//! Core scheduling abstractions: tasks, cost ordering, the work queue, the
//! worker pool, the cycle loop, and the bridge contract.

pub mod audit;
pub mod bridge;
pub mod cost;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod signal;
pub mod task;
pub mod work_queue;
pub mod worker_pool;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, SharedAuditSink,
};
pub use bridge::{Delivery, EventBridge, Handler, HandlerMap, Message};
pub use cost::{CostModel, DeclaredCostModel};
pub use error::{AppResult, SchedulerError};
pub use registry::{TaskRegistry, TaskSource};
pub use scheduler::{CycleScheduler, CycleStats, SchedulerState};
pub use signal::Signal;
pub use task::{Job, Phase, PurgeTask, Task, TaskCost, TaskFn};
pub use work_queue::{WorkItem, WorkQueue};
pub use worker_pool::{PoolStats, WorkerPool};
