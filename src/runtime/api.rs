//! API-facing status and health models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{CycleScheduler, CycleStats, EventBridge, PoolStats, SchedulerState};

/// Scheduler status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Lifecycle state.
    pub state: SchedulerState,
    /// Current or most recent run.
    pub run_id: Option<Uuid>,
    /// Configured period in milliseconds.
    pub period_ms: u64,
    /// Number of tasks dispatched per cycle.
    pub tasks: usize,
    /// Number of purge tasks dispatched per cycle.
    pub purges: usize,
    /// Cycle statistics.
    pub cycle: CycleStats,
    /// Worker pool statistics.
    pub pool: PoolStats,
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Why the scheduler is considered unhealthy.
    pub reason: Option<String>,
}

/// Snapshot the scheduler's state and statistics.
pub fn status<B: EventBridge + ?Sized>(scheduler: &CycleScheduler<B>) -> StatusResponse {
    StatusResponse {
        state: scheduler.state(),
        run_id: scheduler.run_id(),
        period_ms: u64::try_from(scheduler.options().period.as_millis()).unwrap_or(u64::MAX),
        tasks: scheduler.registry().tasks().len(),
        purges: scheduler.registry().purges().len(),
        cycle: scheduler.stats(),
        pool: scheduler.pool_stats(),
    }
}

/// Healthy while running and not stuck in a run of overruns.
pub fn health<B: EventBridge + ?Sized>(scheduler: &CycleScheduler<B>) -> Health {
    let state = scheduler.state();
    if state != SchedulerState::Running {
        return Health {
            ok: false,
            reason: Some(format!("scheduler is {state}")),
        };
    }
    let threshold = u64::from(scheduler.options().overrun_warn_after);
    let consecutive = scheduler.stats().consecutive_overruns;
    if threshold > 0 && consecutive >= threshold {
        return Health {
            ok: false,
            reason: Some(format!("{consecutive} consecutive cycle overruns")),
        };
    }
    Health { ok: true, reason: None }
}
