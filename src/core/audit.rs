//! Audit sink implementations.
//!
//! Provides a bounded in-memory trail of notable scheduler events: run
//! lifecycle, cycle overruns, and per-task failures.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::{now_ms, Timestamp};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A scheduler run entered its cycle loop.
    RunStarted,
    /// A scheduler run finished teardown.
    RunStopped,
    /// A cycle took longer than the period.
    CycleOverrun,
    /// A task or purge callable returned an error.
    TaskFailed,
    /// A task or purge callable panicked.
    TaskPanicked,
    /// A callable exceeded the slow task threshold.
    SlowTask,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Identifier of the scheduler run that produced the event.
    pub run_id: Uuid,
    /// Cycle sequence number, when the event belongs to a cycle.
    pub cycle: Option<u64>,
    /// Task name, when the event belongs to a task.
    pub task: Option<String>,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: Timestamp,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Audit sink shared between the scheduler thread and the workers.
pub type SharedAuditSink = Arc<Mutex<dyn AuditSink>>;

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Stored events with the given action.
    #[must_use]
    pub fn events_with(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    run_id: Uuid,
    cycle: Option<u64>,
    task: Option<&str>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4(),
        run_id,
        cycle,
        task: task.map(str::to_owned),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}

/// Record into an optional shared sink.
pub(crate) fn record(sink: Option<&SharedAuditSink>, event: impl FnOnce() -> AuditEvent) {
    if let Some(sink) = sink {
        sink.lock().record(event());
    }
}
