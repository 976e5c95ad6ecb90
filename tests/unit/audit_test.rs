//! Tests for audit functionality

use prometheus_cycle_scheduler::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink,
};
use uuid::Uuid;

#[test]
fn test_audit_event_creation() {
    let run_id = Uuid::new_v4();
    let event = build_audit_event(
        run_id,
        Some(7),
        Some("temperature/avg_5min"),
        AuditAction::TaskFailed,
        Some("no samples".to_string()),
    );

    assert_eq!(event.run_id, run_id);
    assert_eq!(event.cycle, Some(7));
    assert_eq!(event.task.as_deref(), Some("temperature/avg_5min"));
    assert_eq!(event.action, AuditAction::TaskFailed);
    assert!(event.created_at_ms > 0);
    assert_ne!(event.event_id, Uuid::nil());
}

#[test]
fn test_in_memory_sink_is_bounded() {
    let mut sink = InMemoryAuditSink::new(2);
    let run_id = Uuid::new_v4();
    for cycle in 0..3 {
        sink.record(build_audit_event(run_id, Some(cycle), None, AuditAction::CycleOverrun, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].cycle, Some(1));
    assert_eq!(events[1].cycle, Some(2));
}

#[test]
fn test_events_with_filters_by_action() {
    let mut sink = InMemoryAuditSink::new(10);
    let run_id = Uuid::new_v4();
    sink.record(build_audit_event(run_id, None, None, AuditAction::RunStarted, None));
    sink.record(build_audit_event(run_id, Some(0), Some("t"), AuditAction::TaskPanicked, None));
    sink.record(build_audit_event(run_id, None, None, AuditAction::RunStopped, None));

    assert_eq!(sink.events_with(AuditAction::TaskPanicked).len(), 1);
    assert!(sink.events_with(AuditAction::SlowTask).is_empty());
}

#[test]
fn test_audit_action_serializes_snake_case() {
    let json = serde_json::to_string(&AuditAction::CycleOverrun).unwrap();
    assert_eq!(json, "\"cycle_overrun\"");
}
