// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Agent timeout, grace periods, and recovery of claimed work.

use maestro_core::{
    AgentActivity, AgentId, AgentStatus, Event, SessionId, TaskId, TaskStatus, TaskType,
};

use super::support::{register_agent, stack, task};

#[tokio::test]
async fn silent_decomposition_agent_walks_the_grace_ladder() {
    let s = stack();
    register_agent(&s, "A1", &["dev"], 1);
    let agent_id = AgentId::new("A1");
    s.registry
        .heartbeat(&agent_id, Some(AgentActivity::Decomposition), None, None)
        .expect("heartbeat");
    let mut events = s.emitter.subscribe();

    // decomposition deadline: 30s x 20, plus the workflow-critical 300s
    s.clock.advance_ms(20 * 30_000 + 300_000 + 1_000);
    let outcome = s.registry.sweep();
    assert_eq!(outcome.grace_entries.len(), 1);
    let grace = loop {
        match events.try_recv().expect("grace event") {
            Event::AgentGracePeriod { agent_id, grace_period_count, activity, .. } => {
                break (agent_id, grace_period_count, activity);
            }
            _ => continue,
        }
    };
    assert_eq!(grace.0, agent_id);
    assert_eq!(grace.1, 1);
    assert_eq!(grace.2, AgentActivity::Decomposition);

    // two more grace periods, then the budget is spent
    s.clock.advance_ms(60_000);
    assert_eq!(s.registry.sweep().grace_entries, vec![(agent_id.clone(), 2)]);
    s.clock.advance_ms(60_000);
    assert_eq!(s.registry.sweep().grace_entries, vec![(agent_id.clone(), 3)]);

    s.clock.advance_ms(60_000);
    let outcome = s.registry.sweep();
    assert_eq!(outcome.offlined.len(), 1);
    assert_eq!(s.registry.get(&agent_id).expect("agent").status, AgentStatus::Offline);
}

#[tokio::test]
async fn offline_agent_claims_return_their_tasks_to_pending() {
    let s = stack();
    let agent_id = AgentId::new("A1");

    // no agent yet: the dispatcher parks the task
    let outcome = s
        .coordinator
        .submit_workflow(
            SessionId::new("sess-1"),
            None,
            vec![task("T0001", TaskType::Development, &["dev"])],
            vec![],
        )
        .await
        .expect("submit");
    let workflow_id = outcome.workflow_id.expect("workflow");

    // the agent arrives, claims the task, then goes silent forever
    register_agent(&s, "A1", &["dev"], 1);
    s.coordinator.agent_claim(&agent_id, Some(TaskId::new("T0001"))).await.expect("claim");
    s.registry
        .heartbeat(&agent_id, Some(AgentActivity::TaskExecution), Some(20), None)
        .expect("heartbeat");

    // task_execution timeout (180s) + three grace periods (180s)
    s.clock.advance_ms(180_000 + 3 * 60_000 + 1_000);
    s.coordinator.liveness_sweep().await;

    assert_eq!(s.registry.get(&agent_id).expect("agent").status, AgentStatus::Offline);
    assert!(s.registry.claim_of(&TaskId::new("T0001")).is_none());
    let workflow = s.coordinator.workflow(&workflow_id).expect("workflow");
    assert_eq!(workflow.tasks["T0001"].status, TaskStatus::Pending);
}

#[tokio::test]
async fn heartbeat_rescues_an_agent_mid_grace() {
    let s = stack();
    register_agent(&s, "A1", &["dev"], 1);
    let agent_id = AgentId::new("A1");

    // idle deadline is 60s
    s.clock.advance_ms(61_000);
    assert_eq!(s.registry.sweep().grace_entries.len(), 1);

    s.registry.heartbeat(&agent_id, None, None, None).expect("heartbeat");
    assert_eq!(s.registry.get(&agent_id).expect("agent").grace_period_count, 0);

    // the clock restarts from the heartbeat
    s.clock.advance_ms(59_000);
    assert!(s.registry.sweep().grace_entries.is_empty());
}
