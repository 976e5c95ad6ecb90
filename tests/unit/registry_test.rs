//! Tests for task registry assembly and ordering

use prometheus_cycle_scheduler::config::{MethodDefinition, TaskDefinition};
use prometheus_cycle_scheduler::core::{
    CostModel, DeclaredCostModel, Handler, Message, PurgeTask, SchedulerError, Task, TaskCost, TaskFn,
    TaskRegistry, TaskSource,
};
use rand::Rng;
use std::sync::Arc;

struct NoopSource {
    topic: Option<String>,
}

impl TaskSource for NoopSource {
    fn task(&self, method: &MethodDefinition) -> Result<TaskFn, SchedulerError> {
        if method.name == "unknown" {
            return Err(SchedulerError::config("unknown method"));
        }
        Ok(Arc::new(|_| Ok(())))
    }

    fn purge(&self) -> TaskFn {
        Arc::new(|_| Ok(()))
    }

    fn subscriptions(&self) -> Vec<(String, Handler)> {
        self.topic
            .iter()
            .map(|topic| (topic.clone(), Arc::new(|_: &Message| {}) as Handler))
            .collect()
    }
}

fn method(name: &str, cost: f64) -> MethodDefinition {
    MethodDefinition {
        name: name.into(),
        cost: Some(cost),
        window_secs: None,
        params: serde_json::Value::Null,
    }
}

fn definition(name: &str, topic: Option<&str>, methods: Vec<MethodDefinition>) -> TaskDefinition {
    TaskDefinition {
        name: name.into(),
        topic: topic.map(str::to_owned),
        methods,
        params: serde_json::Value::Null,
    }
}

fn source_for(def: &TaskDefinition) -> Result<Box<dyn TaskSource>, SchedulerError> {
    Ok(Box::new(NoopSource {
        topic: def.topic.clone(),
    }))
}

#[test]
fn test_random_costs_dispatch_non_increasing() {
    let mut rng = rand::rng();
    for _ in 0..20 {
        let count = rng.random_range(1..40);
        let tasks: Vec<Task> = (0..count)
            .map(|i| {
                let cost = TaskCost::new(rng.random_range(0.0..1_000.0)).unwrap();
                Task::new(format!("t{i}"), cost, |_| Ok(()))
            })
            .collect();
        let registry = TaskRegistry::new(tasks, Vec::new());

        assert_eq!(registry.tasks().len(), count);
        for pair in registry.tasks().windows(2) {
            assert!(pair[0].cost() >= pair[1].cost());
        }
    }
}

#[test]
fn test_equal_costs_keep_given_order() {
    let cost = TaskCost::new(1.0).unwrap();
    let registry = TaskRegistry::new(
        vec![
            Task::new("a", cost, |_| Ok(())),
            Task::new("b", TaskCost::new(2.0).unwrap(), |_| Ok(())),
            Task::new("c", cost, |_| Ok(())),
        ],
        vec![PurgeTask::new("p", |_| Ok(()))],
    );
    let names: Vec<&str> = registry.tasks().iter().map(Task::name).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
    assert_eq!(registry.purges().len(), 1);
}

#[test]
fn test_build_names_and_orders_tasks() {
    let defs = vec![
        definition("humidity", None, vec![method("max", 1.0)]),
        definition(
            "temperature",
            Some("sensors/temperature"),
            vec![method("avg_5min", 300.0), method("avg_1h", 3600.0)],
        ),
    ];

    let registry = TaskRegistry::build(&defs, &DeclaredCostModel::new(), source_for).unwrap();

    let names: Vec<&str> = registry.tasks().iter().map(Task::name).collect();
    assert_eq!(
        names,
        vec!["temperature/avg_1h", "temperature/avg_5min", "humidity/max"]
    );
    let purges: Vec<&str> = registry.purges().iter().map(PurgeTask::name).collect();
    assert_eq!(purges, vec!["humidity/purge", "temperature/purge"]);
    assert!(registry.handlers().get("sensors/temperature").is_some());
}

#[test]
fn test_build_fails_on_unresolvable_method() {
    let defs = vec![definition("temperature", None, vec![method("unknown", 1.0)])];
    let err = TaskRegistry::build(&defs, &DeclaredCostModel::new(), source_for).unwrap_err();
    assert!(matches!(err, SchedulerError::Config(msg) if msg.contains("temperature")));
}

#[test]
fn test_build_fails_on_factory_error() {
    let defs = vec![definition("ghost", None, vec![method("m", 1.0)])];
    let result = TaskRegistry::build(&defs, &DeclaredCostModel::new(), |_| {
        Err(SchedulerError::config("no such source type"))
    });
    assert!(result.is_err());
}

#[test]
fn test_build_rejects_duplicate_subscriptions() {
    let defs = vec![
        definition("a", Some("shared/topic"), vec![method("m", 1.0)]),
        definition("b", Some("shared/topic"), vec![method("m", 1.0)]),
    ];
    assert!(TaskRegistry::build(&defs, &DeclaredCostModel::new(), source_for).is_err());
}

#[test]
fn test_declared_cost_model_window_fallback() {
    let model = DeclaredCostModel::new().with_samples_per_sec(0.5);
    let windowed = MethodDefinition {
        name: "avg_1h".into(),
        cost: None,
        window_secs: Some(3600),
        params: serde_json::Value::Null,
    };
    assert_eq!(model.estimate(&windowed).unwrap().value(), 1800.0);

    let bare = MethodDefinition {
        window_secs: None,
        ..windowed
    };
    assert!(model.estimate(&bare).is_err());
}
