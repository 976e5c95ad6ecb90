//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Everything here is fatal for the operation that returned it. Failures inside
/// a task callable are not represented: they are contained by the worker pool.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration is malformed or a task definition cannot be resolved.
    #[error("configuration error: {0}")]
    Config(String),
    /// The event bridge did not signal readiness in time.
    #[error("bridge not connected after {0:?}")]
    ConnectTimeout(Duration),
    /// Event bridge failure with context.
    #[error("bridge error: {0}")]
    Bridge(String),
    /// `start()` was called on a scheduler that is not stopped.
    #[error("scheduler already running")]
    AlreadyRunning,
    /// A worker or scheduler thread could not be spawned.
    #[error("thread spawn failed: {0}")]
    Spawn(String),
}

impl SchedulerError {
    /// Shorthand for building a [`SchedulerError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
///
/// Task and purge callables return this type.
pub type AppResult<T> = Result<T, anyhow::Error>;
