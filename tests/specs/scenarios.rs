// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Happy-path and cycle-rejection scenarios.

use maestro_core::{
    Dependency, JobStatus, SessionId, TaskStatus, TaskType, TransportHint, WorkflowStatus,
};
use maestro_graph::{validate_dependencies, CycleSeverity};

use super::support::{register_agent, stack, task, wait_until};

#[tokio::test]
async fn happy_path_two_task_workflow() {
    let s = stack();
    register_agent(&s, "A1", &["dev", "test"], 2);

    let (job, _) = s.jobs.start_job(SessionId::new("sess-1"), TransportHint::Pull, "orchestrate");
    let outcome = s
        .coordinator
        .submit_workflow(
            SessionId::new("sess-1"),
            Some(job.job_id.clone()),
            vec![
                task("T0001", TaskType::Development, &["dev"]),
                task("T0002", TaskType::Testing, &["test"]),
            ],
            vec![Dependency::requires("T0001", "T0002")],
        )
        .await
        .expect("submit");
    assert_eq!(
        outcome.report.execution_order.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        vec!["T0001", "T0002"],
    );
    let workflow_id = outcome.workflow_id.expect("workflow created");

    wait_until("workflow completes", || {
        s.coordinator
            .workflow(&workflow_id)
            .is_some_and(|w| w.status == WorkflowStatus::Completed)
    })
    .await;

    let workflow = s.coordinator.workflow(&workflow_id).expect("workflow");
    assert!(workflow.tasks.values().all(|t| t.status == TaskStatus::Completed));
    // T0001 finished before T0002 could start
    let finish_order: Vec<&str> = workflow
        .history
        .iter()
        .filter(|r| r.to == TaskStatus::Completed)
        .map(|r| r.task_id.as_str())
        .collect();
    assert_eq!(finish_order, vec!["T0001", "T0002"]);

    let job = s.jobs.get_job(&job.job_id).expect("job");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
}

#[tokio::test]
async fn cycle_rejection_reports_diagnostics() {
    let tasks = vec![
        task("T0001", TaskType::Development, &[]),
        task("T0002", TaskType::Development, &[]),
        task("T0003", TaskType::Development, &[]),
    ];
    let deps = vec![
        Dependency::requires("T0001", "T0002"),
        Dependency::requires("T0002", "T0003"),
        Dependency::requires("T0003", "T0001"),
    ];
    let report = validate_dependencies(&tasks, &deps, &Default::default());

    assert_eq!(report.circular_dependencies.len(), 1);
    let cycle = &report.circular_dependencies[0];
    assert_eq!(
        cycle.cycle.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        vec!["T0001", "T0002", "T0003", "T0001"],
    );
    assert_eq!(cycle.severity, CycleSeverity::Medium);
    assert!(cycle.resolution_options.len() >= 3);
    assert!(report.execution_order.is_empty());
}

#[tokio::test]
async fn cycle_submission_creates_no_workflow() {
    let s = stack();
    let outcome = s
        .coordinator
        .submit_workflow(
            SessionId::new("sess-1"),
            None,
            vec![
                task("T0001", TaskType::Development, &[]),
                task("T0002", TaskType::Development, &[]),
            ],
            vec![
                Dependency::requires("T0001", "T0002"),
                Dependency::requires("T0002", "T0001"),
            ],
        )
        .await
        .expect("submit");
    assert!(outcome.workflow_id.is_none());
    assert_eq!(s.coordinator.workflow_count(), 0);
}
