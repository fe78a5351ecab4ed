// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;
use maestro_core::task::TaskBuilder;
use maestro_core::FakeClock;

fn registry_with(
    dir: &tempfile::TempDir,
    config: HeartbeatConfig,
) -> (Arc<AgentRegistry<FakeClock>>, FakeClock) {
    let clock = FakeClock::new();
    let emitter = Arc::new(EventEmitter::new(clock.clone(), 64));
    let store = AgentRegistryStore::new(dir.path().join("agents.json"));
    (Arc::new(AgentRegistry::new(config, clock.clone(), emitter, store)), clock)
}

fn registry(dir: &tempfile::TempDir) -> (Arc<AgentRegistry<FakeClock>>, FakeClock) {
    registry_with(dir, HeartbeatConfig::default())
}

fn caps(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn register(reg: &AgentRegistry<FakeClock>, id: &str, capabilities: &[&str], max: usize) -> Agent {
    reg.register(RegisterAgent {
        agent_id: AgentId::new(id),
        name: id.to_string(),
        capabilities: caps(capabilities),
        max_concurrent_tasks: max,
    })
    .unwrap()
}

fn dev_task(id: &str) -> Task {
    TaskBuilder::default().task_id(id).required_capabilities(caps(&["dev"])).build()
}

#[test]
fn registration_clamps_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    let agent = register(&reg, "agent-1", &["dev"], 0);
    assert_eq!(agent.max_concurrent_tasks, 1);
    let agent = register(&reg, "agent-2", &["dev"], 99);
    assert_eq!(agent.max_concurrent_tasks, 10);
}

#[test]
fn assignment_requires_capability_superset() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["test"], 2);
    assert!(reg.assign(&dev_task("T0001")).is_none());

    register(&reg, "agent-2", &["dev", "test"], 2);
    let assignment = reg.assign(&dev_task("T0001")).unwrap();
    assert_eq!(assignment.agent_id, "agent-2");
}

#[test]
fn assignment_creates_claim_and_marks_busy() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    let assignment = reg.assign(&dev_task("T0001")).unwrap();
    assert_eq!(assignment.claim.task_id, "T0001");
    assert_eq!(
        assignment.claim.expires_at - assignment.claim.claimed_at,
        HeartbeatConfig::default().claim_ttl_ms,
    );
    let agent = reg.get(&AgentId::new("agent-1")).unwrap();
    assert_eq!(agent.status, AgentStatus::Busy);
    assert!(agent.current_tasks.contains("T0001"));

    // at capacity now
    assert!(reg.assign(&dev_task("T0002")).is_none());
}

#[test]
fn claimed_task_is_not_reassigned() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 2);
    register(&reg, "agent-2", &["dev"], 2);
    let task = dev_task("T0001");
    reg.assign(&task).unwrap();
    assert!(reg.assign(&task).is_none());
}

#[test]
fn idle_specialist_beats_busy_generalist() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-generalist", &["dev", "test", "deploy", "docs"], 2);
    register(&reg, "agent-specialist", &["dev"], 2);
    let assignment = reg.assign(&dev_task("T0001")).unwrap();
    assert_eq!(assignment.agent_id, "agent-specialist");
}

#[test]
fn equal_scores_tie_break_by_agent_id() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-b", &["dev"], 2);
    register(&reg, "agent-a", &["dev"], 2);
    let assignment = reg.assign(&dev_task("T0001")).unwrap();
    assert_eq!(assignment.agent_id, "agent-a");
}

#[test]
fn release_returns_agent_to_available_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    reg.assign(&dev_task("T0001")).unwrap();

    let agent_id = reg.release(&TaskId::new("T0001"), Some(true)).unwrap();
    assert_eq!(agent_id, "agent-1");
    let agent = reg.get(&agent_id).unwrap();
    assert_eq!(agent.status, AgentStatus::Available);
    assert_eq!(agent.current_activity, AgentActivity::Idle);
    assert_eq!(agent.tasks_completed, 1);
    assert!(reg.claim_of(&TaskId::new("T0001")).is_none());
}

#[test]
fn deregister_releases_all_claims() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 2);
    reg.assign(&dev_task("T0001")).unwrap();
    reg.assign(&dev_task("T0002")).unwrap();

    let mut released = reg.deregister(&AgentId::new("agent-1")).unwrap();
    released.sort();
    assert_eq!(released, vec![TaskId::new("T0001"), TaskId::new("T0002")]);
    assert!(reg.get(&AgentId::new("agent-1")).is_none());
}

#[test]
fn heartbeat_resets_grace_and_updates_activity() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);

    // idle timeout is base x 2 = 60s; miss it and sweep
    clock.advance_ms(61_000);
    let outcome = reg.sweep();
    assert_eq!(outcome.grace_entries, vec![(AgentId::new("agent-1"), 1)]);

    reg.heartbeat(&AgentId::new("agent-1"), Some(AgentActivity::Research), Some(50), None)
        .unwrap();
    let agent = reg.get(&AgentId::new("agent-1")).unwrap();
    assert_eq!(agent.grace_period_count, 0);
    assert_eq!(agent.current_activity, AgentActivity::Research);
    assert_eq!(agent.progress_percentage, 50);
}

#[test]
fn grace_periods_are_bounded_then_offline() {
    let dir = tempfile::tempdir().unwrap();
    // long claim TTL so claim expiry does not fire before the grace ladder
    let config = HeartbeatConfig { claim_ttl_ms: 600_000, ..Default::default() };
    let (reg, clock) = registry_with(&dir, config);
    register(&reg, "agent-1", &["dev"], 1);
    reg.assign(&dev_task("T0001")).unwrap();

    // task_execution timeout = 30s x 6 = 180s
    clock.advance_ms(180_000);
    assert_eq!(reg.sweep().grace_entries.len(), 1);
    // still inside the first grace period: no new entry
    clock.advance_ms(1_000);
    assert!(reg.sweep().grace_entries.is_empty());

    clock.advance_ms(59_000);
    assert_eq!(reg.sweep().grace_entries, vec![(AgentId::new("agent-1"), 2)]);
    clock.advance_ms(60_000);
    assert_eq!(reg.sweep().grace_entries, vec![(AgentId::new("agent-1"), 3)]);

    // full grace budget exhausted: offline, claim released
    clock.advance_ms(60_000);
    let outcome = reg.sweep();
    assert_eq!(outcome.offlined.len(), 1);
    assert_eq!(outcome.offlined[0].1, vec![TaskId::new("T0001")]);
    assert_eq!(outcome.released_tasks(), vec![TaskId::new("T0001")]);
    let agent = reg.get(&AgentId::new("agent-1")).unwrap();
    assert_eq!(agent.status, AgentStatus::Offline);
    assert!(agent.current_tasks.is_empty());
}

#[test]
fn decomposition_gets_twenty_x_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    reg.heartbeat(&AgentId::new("agent-1"), Some(AgentActivity::Decomposition), None, None)
        .unwrap();

    // decomposition: 30s x 20 = 600s, plus the workflow-critical 300s
    clock.advance_ms(899_000);
    assert!(reg.sweep().grace_entries.is_empty());
    clock.advance_ms(2_000);
    assert_eq!(reg.sweep().grace_entries.len(), 1);
}

#[test]
fn progress_extends_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    reg.heartbeat(&AgentId::new("agent-1"), Some(AgentActivity::TaskExecution), None, None)
        .unwrap();

    // 60s in, report 25% done with a declared expected duration:
    // estimated remaining = 60s x 3 = 180s, extension = 270s
    clock.advance_ms(60_000);
    reg.heartbeat(&AgentId::new("agent-1"), None, Some(25), Some(240_000)).unwrap();

    // plain task_execution deadline would be 180s after this heartbeat
    clock.advance_ms(181_000);
    assert!(reg.sweep().grace_entries.is_empty(), "extension should push the deadline");

    clock.advance_ms(300_000);
    assert!(!reg.sweep().grace_entries.is_empty());
}

#[test]
fn offline_agent_recovers_on_heartbeat() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    clock.advance_ms(60_000 + 3 * 60_000 + 1_000);
    let outcome = reg.sweep();
    assert_eq!(outcome.offlined.len(), 1);

    reg.heartbeat(&AgentId::new("agent-1"), None, None, None).unwrap();
    let agent = reg.get(&AgentId::new("agent-1")).unwrap();
    assert_eq!(agent.status, AgentStatus::Available);
}

#[test]
fn expired_claim_without_progress_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    reg.assign(&dev_task("T0001")).unwrap();

    clock.advance_ms(120_000);
    let outcome = reg.sweep();
    assert_eq!(outcome.expired_claims, vec![(AgentId::new("agent-1"), TaskId::new("T0001"))]);
    assert!(reg.claim_of(&TaskId::new("T0001")).is_none());
}

#[test]
fn progress_report_extends_claims() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, clock) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 1);
    reg.assign(&dev_task("T0001")).unwrap();

    clock.advance_ms(100_000);
    reg.heartbeat(&AgentId::new("agent-1"), None, Some(40), None).unwrap();

    clock.advance_ms(100_000);
    // 200s after claim, but the progress report renewed the TTL
    assert!(reg.sweep().expired_claims.is_empty());
    assert!(reg.claim_of(&TaskId::new("T0001")).is_some());
}

#[test]
fn pending_queue_dedups_and_drains() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    reg.enqueue_pending(dev_task("T0001"));
    reg.enqueue_pending(dev_task("T0001"));
    reg.enqueue_pending(dev_task("T0002"));
    let drained = reg.take_pending();
    assert_eq!(drained.len(), 2);
    assert!(reg.take_pending().is_empty());
}

#[test]
fn claim_for_rejects_double_claim() {
    let dir = tempfile::tempdir().unwrap();
    let (reg, _) = registry(&dir);
    register(&reg, "agent-1", &["dev"], 2);
    register(&reg, "agent-2", &["dev"], 2);
    reg.claim_for(&AgentId::new("agent-1"), &TaskId::new("T0001")).unwrap();
    let err = reg.claim_for(&AgentId::new("agent-2"), &TaskId::new("T0001")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn registry_persists_and_restores_without_claims() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (reg, _) = registry(&dir);
        register(&reg, "agent-1", &["dev"], 2);
        reg.assign(&dev_task("T0001")).unwrap();
        // persist a registration-time snapshot exists on disk
        reg.register(RegisterAgent {
            agent_id: AgentId::new("agent-2"),
            name: "agent-2".into(),
            capabilities: caps(&["test"]),
            max_concurrent_tasks: 1,
        })
        .unwrap();
    }
    let (reg, _) = registry(&dir);
    let restored = reg.restore().unwrap();
    assert_eq!(restored, 2);
    let agent = reg.get(&AgentId::new("agent-1")).unwrap();
    assert!(agent.current_tasks.is_empty());
    assert_eq!(agent.status, AgentStatus::Available);
}
