//! Tests for the status and health surface

use prometheus_cycle_scheduler::config::SchedulerOptions;
use prometheus_cycle_scheduler::core::{
    CycleScheduler, SchedulerState, Signal, Task, TaskCost, TaskRegistry,
};
use std::sync::atomic::{AtomicBool, Ordering};
use prometheus_cycle_scheduler::infra::InMemoryBridge;
use prometheus_cycle_scheduler::runtime::{health, status};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn registry() -> TaskRegistry {
    TaskRegistry::new(
        vec![Task::new("t", TaskCost::new(1.0).unwrap(), |_| Ok(()))],
        Vec::new(),
    )
}

#[test]
fn test_status_of_stopped_scheduler() {
    let scheduler = CycleScheduler::new(
        SchedulerOptions::new()
            .with_period(Duration::from_millis(250))
            .with_worker_count(2),
        registry(),
        Arc::new(InMemoryBridge::new()),
    )
    .unwrap();

    let status = status(&scheduler);
    assert_eq!(status.state, SchedulerState::Stopped);
    assert_eq!(status.period_ms, 250);
    assert_eq!(status.tasks, 1);
    assert_eq!(status.purges, 0);
    assert!(status.run_id.is_none());

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"], "stopped");

    let health = health(&scheduler);
    assert!(!health.ok);
    assert_eq!(health.reason.as_deref(), Some("scheduler is stopped"));
}

#[test]
fn test_health_while_running() {
    let scheduler = Arc::new(
        CycleScheduler::new(
            SchedulerOptions::new()
                .with_period(Duration::from_millis(20))
                .with_worker_count(1),
            registry(),
            Arc::new(InMemoryBridge::new()),
        )
        .unwrap(),
    );
    let handle = CycleScheduler::spawn(&scheduler).unwrap();
    assert!(scheduler.wait_for_state(SchedulerState::Running, Duration::from_secs(5)));

    assert!(health(&scheduler).ok);
    let status = status(&scheduler);
    assert!(status.run_id.is_some());
    assert_eq!(status.pool.worker_count, 1);

    thread::sleep(Duration::from_millis(50));
    scheduler.stop();
    handle.join().unwrap().unwrap();
    assert!(!health(&scheduler).ok);
}

#[test]
fn test_health_reports_overruns() {
    let registry = TaskRegistry::new(
        vec![Task::new("slow", TaskCost::new(1.0).unwrap(), |_| {
            thread::sleep(Duration::from_millis(30));
            Ok(())
        })],
        Vec::new(),
    );
    let scheduler = Arc::new(
        CycleScheduler::new(
            SchedulerOptions::new()
                .with_period(Duration::from_millis(10))
                .with_worker_count(1)
                .with_overrun_warn_after(2),
            registry,
            Arc::new(InMemoryBridge::new()),
        )
        .unwrap(),
    );
    let handle = CycleScheduler::spawn(&scheduler).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while scheduler.stats().consecutive_overruns < 2 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let health = health(&scheduler);

    scheduler.stop();
    handle.join().unwrap().unwrap();

    assert!(!health.ok);
    assert!(health.reason.unwrap().contains("overruns"));
}

#[test]
fn test_restart_starts_with_clean_overrun_streak() {
    let blocking = Arc::new(AtomicBool::new(false));
    let gate = Arc::new(Signal::new());
    let (blocking_clone, gate_clone) = (Arc::clone(&blocking), Arc::clone(&gate));
    let registry = TaskRegistry::new(
        vec![Task::new("t", TaskCost::new(1.0).unwrap(), move |_| {
            if blocking_clone.load(Ordering::SeqCst) {
                gate_clone.wait();
            } else {
                thread::sleep(Duration::from_millis(30));
            }
            Ok(())
        })],
        Vec::new(),
    );
    let scheduler = Arc::new(
        CycleScheduler::new(
            SchedulerOptions::new()
                .with_period(Duration::from_millis(10))
                .with_worker_count(1)
                .with_overrun_warn_after(2),
            registry,
            Arc::new(InMemoryBridge::new()),
        )
        .unwrap(),
    );

    // First run: every cycle overruns
    let handle = CycleScheduler::spawn(&scheduler).unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while scheduler.stats().consecutive_overruns < 2 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    scheduler.stop();
    handle.join().unwrap().unwrap();
    assert!(scheduler.stats().consecutive_overruns >= 2);

    // Second run: hold the first cycle open and look at health meanwhile
    blocking.store(true, Ordering::SeqCst);
    let handle = CycleScheduler::spawn(&scheduler).unwrap();
    assert!(scheduler.wait_for_state(SchedulerState::Running, Duration::from_secs(5)));
    let stats = scheduler.stats();
    let health = health(&scheduler);

    gate.set();
    scheduler.stop();
    handle.join().unwrap().unwrap();

    assert_eq!(stats.consecutive_overruns, 0);
    assert!(stats.overruns >= 2);
    assert!(health.ok, "unexpected: {:?}", health.reason);
}
