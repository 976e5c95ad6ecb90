//! Tests for configuration validation

use prometheus_cycle_scheduler::config::{
    SchedulerConfig, SchedulerOptions, WorkerPoolConfig, CONFIG_PATH_ENV,
};
use prometheus_cycle_scheduler::core::SchedulerError;
use std::time::Duration;

const CONFIG: &str = r#"{
    "update_cycle": 60,
    "number_worker": 4,
    "connect_timeout_secs": 5,
    "watchdog": { "overrun_warn_after": 2, "slow_task_warn_ms": 1500 },
    "tasks": [
        {
            "name": "temperature",
            "topic": "sensors/temperature",
            "methods": [
                { "name": "avg_1h", "window_secs": 3600 },
                { "name": "avg_5min", "window_secs": 300 }
            ]
        },
        {
            "name": "humidity",
            "methods": [ { "name": "max", "cost": 12.5, "params": { "unit": "%" } } ]
        }
    ]
}"#;

#[test]
fn test_scheduler_config_parses_full_document() {
    let cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    assert_eq!(cfg.update_cycle, 60);
    assert_eq!(cfg.number_worker, 4);
    assert_eq!(cfg.connect_timeout_secs, 5);
    assert_eq!(cfg.disconnect_timeout_secs, 10);
    assert_eq!(cfg.tasks.len(), 2);
    assert_eq!(cfg.tasks[0].topic.as_deref(), Some("sensors/temperature"));
    assert_eq!(cfg.tasks[1].methods[0].cost, Some(12.5));
    assert_eq!(cfg.tasks[1].methods[0].params["unit"], "%");
}

#[test]
fn test_scheduler_config_invalid_worker_count() {
    let json = CONFIG.replace("\"number_worker\": 4", "\"number_worker\": 0");
    let err = SchedulerConfig::from_json_str(&json).unwrap_err();
    assert!(matches!(err, SchedulerError::Config(msg) if msg.contains("number_worker")));
}

#[test]
fn test_scheduler_config_requires_tasks() {
    let json = r#"{ "update_cycle": 60, "number_worker": 1, "tasks": [] }"#;
    assert!(SchedulerConfig::from_json_str(json).is_err());
}

#[test]
fn test_scheduler_config_duplicate_task_names() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.tasks[1].name = "temperature".into();
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("duplicate task"));
}

#[test]
fn test_scheduler_config_task_without_methods() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.tasks[0].methods.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_from_missing_path() {
    let err = SchedulerConfig::from_path("/nonexistent/cycle-scheduler.json").unwrap_err();
    assert!(matches!(err, SchedulerError::Config(msg) if msg.contains("cannot read")));
}

#[test]
fn test_scheduler_config_from_path() {
    let path = std::env::temp_dir().join(format!("cycle-scheduler-{}.json", std::process::id()));
    std::fs::write(&path, CONFIG).unwrap();
    let cfg = SchedulerConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(cfg.tasks.len(), 2);
}

#[test]
fn test_config_path_env_name() {
    assert_eq!(CONFIG_PATH_ENV, "CYCLE_SCHEDULER_CONFIG");
}

#[test]
fn test_options_from_config() {
    let cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    let options = SchedulerOptions::from(&cfg);
    assert_eq!(options.period, Duration::from_secs(60));
    assert_eq!(options.worker_count, 4);
    assert_eq!(options.connect_timeout, Duration::from_secs(5));
    assert_eq!(options.overrun_warn_after, 2);
    assert_eq!(options.slow_task_threshold, Some(Duration::from_millis(1500)));
    assert!(options.validate().is_ok());
}

#[test]
fn test_options_validation() {
    assert!(SchedulerOptions::new().validate().is_ok());
    assert!(SchedulerOptions::new().with_worker_count(0).validate().is_err());
    assert!(SchedulerOptions::new()
        .with_connect_timeout(Duration::ZERO)
        .validate()
        .is_err());
    assert!(SchedulerOptions::new()
        .with_thread_stack_size(0)
        .validate()
        .is_err());
}

#[test]
fn test_zero_period_is_allowed() {
    let options = SchedulerOptions::new().with_period(Duration::ZERO);
    assert!(options.validate().is_ok());
}

#[test]
fn test_worker_pool_config_from_options() {
    let options = SchedulerOptions::new()
        .with_worker_count(3)
        .with_thread_stack_size(256 * 1024)
        .with_slow_task_threshold(Duration::from_millis(250));
    let config = WorkerPoolConfig::from(&options);
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.thread_stack_size, Some(256 * 1024));
    assert_eq!(config.slow_task_threshold, Some(Duration::from_millis(250)));
    assert!(config.validate().is_ok());
    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
}
