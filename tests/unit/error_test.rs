//! Tests for error types

use prometheus_cycle_scheduler::core::SchedulerError;
use std::time::Duration;

#[test]
fn test_scheduler_error_display() {
    let err = SchedulerError::config("number_worker must be greater than 0");
    assert_eq!(
        err.to_string(),
        "configuration error: number_worker must be greater than 0"
    );

    let err = SchedulerError::AlreadyRunning;
    assert_eq!(err.to_string(), "scheduler already running");

    let err = SchedulerError::Spawn("resource temporarily unavailable".into());
    assert_eq!(err.to_string(), "thread spawn failed: resource temporarily unavailable");
}

#[test]
fn test_connect_timeout_mentions_duration() {
    let err = SchedulerError::ConnectTimeout(Duration::from_secs(30));
    assert!(err.to_string().contains("30s"));
}

#[test]
fn test_scheduler_error_converts_into_anyhow() {
    fn fails() -> anyhow::Result<()> {
        Err(SchedulerError::Bridge("broker unreachable".into()))?;
        Ok(())
    }

    let err = fails().unwrap_err();
    assert!(err.to_string().contains("broker unreachable"));
    assert!(matches!(
        err.downcast_ref::<SchedulerError>(),
        Some(SchedulerError::Bridge(_))
    ));
}
