//! Tests for builder functions

use prometheus_cycle_scheduler::builders::build_scheduler;
use prometheus_cycle_scheduler::config::{MethodDefinition, SchedulerConfig};
use prometheus_cycle_scheduler::core::{
    DeclaredCostModel, SchedulerError, SchedulerState, TaskFn, TaskSource,
};
use prometheus_cycle_scheduler::infra::InMemoryBridge;
use std::sync::Arc;
use std::time::Duration;

struct EmptySource;

impl TaskSource for EmptySource {
    fn task(&self, _method: &MethodDefinition) -> Result<TaskFn, SchedulerError> {
        Ok(Arc::new(|_| Ok(())))
    }

    fn purge(&self) -> TaskFn {
        Arc::new(|_| Ok(()))
    }
}

const CONFIG: &str = r#"{
    "update_cycle": 30,
    "number_worker": 3,
    "tasks": [
        { "name": "a", "methods": [ { "name": "cheap", "cost": 1 }, { "name": "dear", "cost": 9 } ] },
        { "name": "b", "methods": [ { "name": "mid", "window_secs": 5 } ] }
    ]
}"#;

#[test]
fn test_build_scheduler_from_config() {
    let cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    let scheduler = build_scheduler(
        &cfg,
        Arc::new(InMemoryBridge::new()),
        &DeclaredCostModel::new(),
        |_| Ok(Box::new(EmptySource)),
    )
    .unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(scheduler.options().period, Duration::from_secs(30));
    assert_eq!(scheduler.options().worker_count, 3);
    let names: Vec<&str> = scheduler.registry().tasks().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["a/dear", "b/mid", "a/cheap"]);
    assert_eq!(scheduler.registry().purges().len(), 2);
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.number_worker = 0;
    let result = build_scheduler(
        &cfg,
        Arc::new(InMemoryBridge::new()),
        &DeclaredCostModel::new(),
        |_| Ok(Box::new(EmptySource)),
    );
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}
