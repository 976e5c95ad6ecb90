//! Configuration models for the scheduler, its workers, and task definitions.

pub mod options;
pub mod scheduler;
pub mod worker_pool;

pub use options::SchedulerOptions;
pub use scheduler::{MethodDefinition, SchedulerConfig, TaskDefinition, WatchdogConfig, CONFIG_PATH_ENV};
pub use worker_pool::WorkerPoolConfig;
