//! Scheduler configuration structures.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Environment variable holding the path of the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CYCLE_SCHEDULER_CONFIG";

const fn default_connect_timeout_secs() -> u64 {
    30
}

const fn default_disconnect_timeout_secs() -> u64 {
    10
}

const fn default_overrun_warn_after() -> u32 {
    3
}

/// One method of a task definition; each yields a single scheduled task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDefinition {
    /// Method name, unique within its task definition.
    pub name: String,
    /// Explicit cost estimate. Takes precedence over `window_secs`.
    #[serde(default)]
    pub cost: Option<f64>,
    /// Length of the data window the method scans, in seconds.
    #[serde(default)]
    pub window_secs: Option<u64>,
    /// Free-form parameters passed through to the task source.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A configured task definition, resolved into a task source at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Unique name of the definition.
    pub name: String,
    /// Inbound topic the source subscribes to, if any.
    #[serde(default)]
    pub topic: Option<String>,
    /// Methods, each producing one task.
    pub methods: Vec<MethodDefinition>,
    /// Free-form parameters passed through to the task source.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Overrun and slow-task warning thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Warn once this many consecutive cycles overran the period. 0 disables.
    #[serde(default = "default_overrun_warn_after")]
    pub overrun_warn_after: u32,
    /// Warn about any single task running longer than this.
    #[serde(default)]
    pub slow_task_warn_ms: Option<u64>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            overrun_warn_after: default_overrun_warn_after(),
            slow_task_warn_ms: None,
        }
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cycle period in seconds.
    pub update_cycle: u64,
    /// Number of worker threads.
    pub number_worker: usize,
    /// Upper bound on the wait for bridge readiness.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on the wait for bridge disconnect acknowledgement.
    #[serde(default = "default_disconnect_timeout_secs")]
    pub disconnect_timeout_secs: u64,
    /// Overrun and slow-task warnings.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Task definitions.
    pub tasks: Vec<TaskDefinition>,
}

impl TaskDefinition {
    /// Validate a single definition.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("task name must not be empty".into());
        }
        if self.methods.is_empty() {
            return Err("at least one method must be defined".into());
        }
        let mut seen = HashSet::new();
        for method in &self.methods {
            if method.name.trim().is_empty() {
                return Err("method name must not be empty".into());
            }
            if !seen.insert(method.name.as_str()) {
                return Err(format!("duplicate method `{}`", method.name));
            }
        }
        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate worker count and all task definitions.
    pub fn validate(&self) -> Result<(), String> {
        if self.number_worker == 0 {
            return Err("number_worker must be greater than 0".into());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".into());
        }
        if self.tasks.is_empty() {
            return Err("at least one task must be defined".into());
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            task.validate()
                .map_err(|e| format!("task `{}` invalid: {e}", task.name))?;
            if !seen.insert(task.name.as_str()) {
                return Err(format!("duplicate task `{}`", task.name));
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::config(format!("parse error: {e}")))?;
        cfg.validate().map_err(SchedulerError::Config)?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the file cannot be read or is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&input)
    }

    /// Load the file named by [`CONFIG_PATH_ENV`], after applying any `.env` file.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the variable is unset or the file is invalid.
    pub fn from_env() -> Result<Self, SchedulerError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_err(|_| SchedulerError::config(format!("{CONFIG_PATH_ENV} is not set")))?;
        Self::from_path(path)
    }
}
