// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use crate::task::TaskBuilder;
use crate::Dependency;

fn workflow_with(tasks: &[&str], deps: Vec<Dependency>) -> Workflow {
    let mut wf = Workflow::new(WorkflowId::new("wf-1"), SessionId::new("sess-1"), 1_000);
    for id in tasks {
        let task = TaskBuilder::default().task_id(*id).workflow_id("wf-1").build();
        wf.tasks.insert(task.task_id.clone(), task);
    }
    wf.dependencies = deps;
    wf
}

#[test]
fn new_workflow_starts_initializing() {
    let wf = Workflow::new(WorkflowId::new("wf-1"), SessionId::new("s"), 5);
    assert_eq!(wf.status, WorkflowStatus::Initializing);
    assert_eq!(wf.phase, WorkflowPhase::Decomposition);
    assert_eq!(wf.start_time, 5);
    assert!(wf.end_time.is_none());
}

#[test]
fn endpoint_check_rejects_unknown_task() {
    let wf = workflow_with(&["T0001"], vec![Dependency::requires("T0001", "T0099")]);
    let err = wf.check_dependency_endpoints().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
}

#[test]
fn readiness_requires_completed_prerequisites() {
    let mut wf = workflow_with(
        &["T0001", "T0002"],
        vec![Dependency::requires("T0001", "T0002")],
    );
    assert!(wf.is_ready(&TaskId::new("T0001")));
    assert!(!wf.is_ready(&TaskId::new("T0002")));

    wf.tasks.get_mut("T0001").unwrap().status = TaskStatus::Completed;
    assert!(wf.is_ready(&TaskId::new("T0002")));
}

#[test]
fn suggests_edges_do_not_gate_readiness() {
    let wf = workflow_with(
        &["T0001", "T0002"],
        vec![Dependency::suggests("T0001", "T0002")],
    );
    assert!(wf.is_ready(&TaskId::new("T0002")));
}

#[test]
fn ready_tasks_preserve_submission_order() {
    let wf = workflow_with(&["T0003", "T0001", "T0002"], vec![]);
    let ready: Vec<String> = wf.ready_tasks().iter().map(|t| t.to_string()).collect();
    assert_eq!(ready, vec!["T0003", "T0001", "T0002"]);
}

#[test]
fn dependents_are_transitive() {
    let wf = workflow_with(
        &["T0001", "T0002", "T0003", "T0004"],
        vec![
            Dependency::requires("T0001", "T0002"),
            Dependency::requires("T0002", "T0003"),
            Dependency::suggests("T0001", "T0004"),
        ],
    );
    let deps = wf.dependents_of(&TaskId::new("T0001"));
    assert!(deps.contains("T0002"));
    assert!(deps.contains("T0003"));
    // soft edge does not propagate cancellation
    assert!(!deps.contains("T0004"));
}

#[test]
fn history_is_bounded() {
    let mut wf = workflow_with(&["T0001"], vec![]);
    for i in 0..10 {
        wf.record_transition(
            TransitionRecord {
                task_id: TaskId::new("T0001"),
                from: TaskStatus::Pending,
                to: TaskStatus::InProgress,
                timestamp: i,
                reason: "tick".into(),
                triggered_by: "test".into(),
                is_automated: true,
            },
            4,
        );
    }
    assert_eq!(wf.history.len(), 4);
    // oldest entries were trimmed
    assert_eq!(wf.history.first().map(|r| r.timestamp), Some(6));
}

#[test]
fn workflow_round_trips_through_json() {
    let wf = workflow_with(
        &["T0001", "T0002"],
        vec![Dependency::requires("T0001", "T0002")],
    );
    let json = serde_json::to_string(&wf).unwrap();
    let parsed: Workflow = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.workflow_id, wf.workflow_id);
    assert_eq!(parsed.tasks.len(), 2);
    // insertion order survives serialization
    assert_eq!(
        parsed.tasks.keys().cloned().collect::<Vec<_>>(),
        wf.tasks.keys().cloned().collect::<Vec<_>>(),
    );
}
