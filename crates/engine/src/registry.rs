// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Agent registry: registration, capability scoring, claims, liveness.
//!
//! All agent and claim mutations happen here, behind one registry lock.
//! Persistence (agents.json) runs after the lock is released.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use maestro_core::config::HeartbeatConfig;
use maestro_core::{
    Agent, AgentActivity, AgentId, AgentStatus, Claim, Clock, Error, ErrorContext, ErrorKind,
    Event, Task, TaskId,
};
use maestro_storage::AgentRegistryStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::EventEmitter;

/// Registration request, normalized into an [`Agent`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgent {
    pub agent_id: AgentId,
    pub name: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub max_concurrent_tasks: usize,
}

/// Successful task assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub score: f64,
    pub claim: Claim,
}

/// What a liveness sweep decided.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Agents that entered a (new) grace period this sweep.
    pub grace_entries: Vec<(AgentId, u32)>,
    /// Agents marked offline, with the tasks their claims released.
    pub offlined: Vec<(AgentId, Vec<TaskId>)>,
    /// Tasks whose claims expired without progress (agent still online).
    pub expired_claims: Vec<(AgentId, TaskId)>,
}

impl SweepOutcome {
    /// Every task that must return to the ready pool.
    pub fn released_tasks(&self) -> Vec<TaskId> {
        let mut tasks: Vec<TaskId> = self
            .offlined
            .iter()
            .flat_map(|(_, tasks)| tasks.iter().cloned())
            .chain(self.expired_claims.iter().map(|(_, t)| t.clone()))
            .collect();
        tasks.sort();
        tasks.dedup();
        tasks
    }
}

#[derive(Default)]
struct RegistryState {
    agents: HashMap<AgentId, Agent>,
    claims: HashMap<TaskId, Claim>,
    /// Tasks no current agent qualifies for, retried on registration,
    /// heartbeat, and the periodic tick.
    pending: VecDeque<Task>,
}

/// Owns Agent and Claim mutations.
pub struct AgentRegistry<C: Clock> {
    config: HeartbeatConfig,
    clock: C,
    emitter: Arc<EventEmitter<C>>,
    store: AgentRegistryStore,
    state: Mutex<RegistryState>,
}

impl<C: Clock> AgentRegistry<C> {
    pub fn new(
        config: HeartbeatConfig,
        clock: C,
        emitter: Arc<EventEmitter<C>>,
        store: AgentRegistryStore,
    ) -> Self {
        Self { config, clock, emitter, store, state: Mutex::new(RegistryState::default()) }
    }

    /// Load the persisted registry at startup. Claims do not survive a
    /// restart; their tasks were already demoted by workflow recovery.
    pub fn restore(&self) -> Result<usize, Error> {
        let mut agents = self.store.load().map_err(Error::from)?;
        for agent in agents.values_mut() {
            agent.current_tasks.clear();
            agent.recompute_status();
        }
        let count = agents.len();
        self.state.lock().agents = agents;
        Ok(count)
    }

    /// Register (or re-register) an agent.
    ///
    /// `max_concurrent_tasks` is clamped to `[1, max_agent_concurrency]`.
    pub fn register(&self, req: RegisterAgent) -> Result<Agent, Error> {
        let now = self.clock.epoch_ms();
        let agent = Agent {
            agent_id: req.agent_id.clone(),
            name: req.name,
            capabilities: req.capabilities,
            max_concurrent_tasks: req
                .max_concurrent_tasks
                .clamp(1, self.config.max_agent_concurrency),
            current_tasks: BTreeSet::new(),
            status: AgentStatus::Available,
            last_heartbeat: now,
            current_activity: AgentActivity::Idle,
            progress_percentage: 0,
            activity_start_time: now,
            expected_duration_ms: None,
            timeout_extension_ms: 0,
            grace_period_count: 0,
            tasks_completed: 0,
            tasks_failed: 0,
        };
        let snapshot = {
            let mut state = self.state.lock();
            state.agents.insert(agent.agent_id.clone(), agent.clone());
            state.agents.clone()
        };
        self.persist(&snapshot);
        info!(agent = %agent.agent_id, "agent registered");
        self.emitter.emit(Event::AgentRegistered { agent_id: agent.agent_id.clone(), timestamp: now });
        Ok(agent)
    }

    /// Remove an agent, releasing every claim it held.
    /// Returns the released task IDs.
    pub fn deregister(&self, agent_id: &AgentId) -> Result<Vec<TaskId>, Error> {
        let now = self.clock.epoch_ms();
        let (released, snapshot) = {
            let mut state = self.state.lock();
            if state.agents.remove(agent_id).is_none() {
                return Err(self.unknown_agent(agent_id));
            }
            let released: Vec<TaskId> = state
                .claims
                .values()
                .filter(|c| &c.agent_id == agent_id)
                .map(|c| c.task_id.clone())
                .collect();
            state.claims.retain(|_, c| &c.agent_id != agent_id);
            (released, state.agents.clone())
        };
        self.persist(&snapshot);
        self.emitter.emit(Event::AgentDeregistered { agent_id: agent_id.clone(), timestamp: now });
        Ok(released)
    }

    /// Pick the best-scoring agent for a task and claim it.
    ///
    /// Returns `None` when no agent qualifies; the caller parks the task on
    /// the pending queue via [`enqueue_pending`](Self::enqueue_pending).
    pub fn assign(&self, task: &Task) -> Option<Assignment> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();

        if let Some(existing) = state.claims.get(&task.task_id) {
            if !existing.is_expired(now) {
                return None;
            }
        }

        let mut best: Option<(AgentId, f64)> = None;
        for agent in state.agents.values() {
            if !agent.has_capacity() || !agent.covers(&task.required_capabilities) {
                continue;
            }
            let score = self.score(agent, task, now);
            let better = match &best {
                None => true,
                Some((best_id, best_score)) => {
                    score > *best_score
                        || (score == *best_score && agent.agent_id < *best_id)
                }
            };
            if better {
                best = Some((agent.agent_id.clone(), score));
            }
        }

        let (agent_id, score) = best?;
        let claim = Claim {
            task_id: task.task_id.clone(),
            agent_id: agent_id.clone(),
            claimed_at: now,
            expires_at: now + self.config.claim_ttl_ms,
        };
        state.claims.insert(task.task_id.clone(), claim.clone());
        if let Some(agent) = state.agents.get_mut(&agent_id) {
            agent.current_tasks.insert(task.task_id.clone());
            agent.current_activity = AgentActivity::TaskExecution;
            agent.activity_start_time = now;
            agent.recompute_status();
        }
        Some(Assignment { agent_id, score, claim })
    }

    /// Scoring: capability specialization, concurrency slack, history,
    /// heartbeat recency. Weights sum to one.
    fn score(&self, agent: &Agent, task: &Task, now: u64) -> f64 {
        let overlap = if agent.capabilities.is_empty() {
            1.0
        } else {
            task.required_capabilities
                .iter()
                .filter(|c| agent.capabilities.contains(*c))
                .count() as f64
                / agent.capabilities.len() as f64
        };
        let slack = 1.0 - agent.current_tasks.len() as f64 / agent.max_concurrent_tasks as f64;
        let recency = {
            let silent = now.saturating_sub(agent.last_heartbeat) as f64;
            1.0 / (1.0 + silent / self.config.base_interval_ms as f64)
        };
        0.4 * overlap + 0.3 * slack + 0.2 * agent.success_rate() + 0.1 * recency
    }

    /// Park a task that no current agent qualifies for.
    pub fn enqueue_pending(&self, task: Task) {
        let mut state = self.state.lock();
        if !state.pending.iter().any(|t| t.task_id == task.task_id) {
            state.pending.push_back(task);
        }
    }

    /// Drain the pending queue for a retry round.
    pub fn take_pending(&self) -> Vec<Task> {
        self.state.lock().pending.drain(..).collect()
    }

    /// Liveness/progress signal from an agent.
    ///
    /// Any heartbeat resets the grace counter. Progress reports extend the
    /// agent's claims by a fresh TTL.
    pub fn heartbeat(
        &self,
        agent_id: &AgentId,
        activity: Option<AgentActivity>,
        progress: Option<u8>,
        expected_duration_ms: Option<u64>,
    ) -> Result<(), Error> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        let agent = state
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| self.unknown_agent(agent_id))?;

        agent.last_heartbeat = now;
        agent.grace_period_count = 0;
        if agent.status == AgentStatus::Offline {
            agent.status = AgentStatus::Available;
            agent.recompute_status();
        }
        if let Some(activity) = activity {
            if activity != agent.current_activity {
                agent.current_activity = activity;
                agent.activity_start_time = now;
                agent.progress_percentage = 0;
                agent.timeout_extension_ms = 0;
            }
        }
        if let Some(p) = progress {
            agent.progress_percentage = p.min(100);
        }
        if let Some(d) = expected_duration_ms {
            agent.expected_duration_ms = Some(d);
        }
        // Adaptive extension: granted once per progress report, from the
        // agent's own pace estimate.
        let p = agent.progress_percentage;
        if progress.is_some() && p > 10 && p < 100 && agent.expected_duration_ms.is_some() {
            let elapsed = now.saturating_sub(agent.activity_start_time) as f64;
            let fraction = p as f64 / 100.0;
            let estimated_remaining = elapsed * (1.0 - fraction) / fraction;
            agent.timeout_extension_ms = (estimated_remaining * 1.5) as u64;
        }

        if progress.is_some() {
            let held: Vec<TaskId> = agent.current_tasks.iter().cloned().collect();
            let until = now + self.config.claim_ttl_ms;
            for task_id in held {
                if let Some(claim) = state.claims.get_mut(&task_id) {
                    claim.extend_until(until);
                }
            }
        }
        Ok(())
    }

    /// Release a task's claim on completion/failure/cancellation.
    ///
    /// The agent's activity returns to idle when its last task releases.
    pub fn release(&self, task_id: &TaskId, succeeded: Option<bool>) -> Option<AgentId> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        let claim = state.claims.remove(task_id)?;
        if let Some(agent) = state.agents.get_mut(&claim.agent_id) {
            agent.current_tasks.remove(task_id);
            match succeeded {
                Some(true) => agent.tasks_completed += 1,
                Some(false) => agent.tasks_failed += 1,
                None => {}
            }
            if agent.current_tasks.is_empty() {
                agent.current_activity = AgentActivity::Idle;
                agent.activity_start_time = now;
                agent.progress_percentage = 0;
                agent.timeout_extension_ms = 0;
            }
            agent.recompute_status();
        }
        Some(claim.agent_id)
    }

    /// Claim a specific task for an agent (the external claim protocol).
    pub fn claim_for(&self, agent_id: &AgentId, task_id: &TaskId) -> Result<Claim, Error> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        if let Some(existing) = state.claims.get(task_id) {
            if !existing.is_expired(now) {
                return Err(Error::new(
                    ErrorKind::Conflict,
                    format!("task {task_id} is already claimed by {}", existing.agent_id),
                )
                .with_context(
                    ErrorContext::new("registry", "claim").entity(task_id.as_str()),
                ));
            }
        }
        let agent = state
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| self.unknown_agent(agent_id))?;
        if !agent.has_capacity() {
            return Err(Error::new(
                ErrorKind::ResourceExhausted,
                format!("agent {agent_id} is at capacity"),
            )
            .with_context(ErrorContext::new("registry", "claim").entity(agent_id.as_str())));
        }
        agent.current_tasks.insert(task_id.clone());
        agent.current_activity = AgentActivity::TaskExecution;
        agent.activity_start_time = now;
        agent.recompute_status();
        let claim = Claim {
            task_id: task_id.clone(),
            agent_id: agent_id.clone(),
            claimed_at: now,
            expires_at: now + self.config.claim_ttl_ms,
        };
        state.claims.insert(task_id.clone(), claim.clone());
        Ok(claim)
    }

    /// Activity-aware liveness deadline for an agent, excluding grace time.
    ///
    /// `timeout = base x activity multiplier`, plus the extension granted at
    /// the last progress report, plus the fixed workflow-critical extension.
    fn activity_deadline(&self, agent: &Agent) -> u64 {
        let timeout =
            self.config.base_interval_ms * agent.current_activity.timeout_multiplier() as u64;
        let mut deadline = agent.last_heartbeat + timeout + agent.timeout_extension_ms;
        if agent.is_workflow_critical() {
            deadline += self.config.workflow_critical_extension_ms;
        }
        deadline
    }

    /// One liveness sweep: grace entries, offline markings, expired claims.
    ///
    /// Offline marking happens only after the activity deadline plus the
    /// full grace budget elapses with no signal.
    pub fn sweep(&self) -> SweepOutcome {
        let now = self.clock.epoch_ms();
        let mut outcome = SweepOutcome::default();
        let snapshot = {
            let mut state = self.state.lock();

            let ids: Vec<AgentId> = state.agents.keys().cloned().collect();
            for agent_id in ids {
                let Some(agent) = state.agents.get_mut(&agent_id) else {
                    continue;
                };
                if agent.status == AgentStatus::Offline {
                    continue;
                }
                let deadline = self.activity_deadline(agent);
                if now < deadline {
                    continue;
                }
                let grace = self.config.grace_period_ms;
                let allowed = agent.grace_period_count.min(self.config.max_grace_periods);
                if now >= deadline + self.config.max_grace_periods as u64 * grace {
                    // grace budget exhausted
                    agent.status = AgentStatus::Offline;
                    agent.current_activity = AgentActivity::Idle;
                    let held: Vec<TaskId> = agent.current_tasks.iter().cloned().collect();
                    agent.current_tasks.clear();
                    for task_id in &held {
                        state.claims.remove(task_id);
                    }
                    outcome.offlined.push((agent_id.clone(), held));
                } else if now >= deadline + allowed as u64 * grace
                    && agent.grace_period_count < self.config.max_grace_periods
                {
                    agent.grace_period_count += 1;
                    outcome.grace_entries.push((agent_id.clone(), agent.grace_period_count));
                }
            }

            // claims that expired while their agent stayed alive
            let expired: Vec<Claim> = state
                .claims
                .values()
                .filter(|c| c.is_expired(now))
                .cloned()
                .collect();
            for claim in expired {
                state.claims.remove(&claim.task_id);
                if let Some(agent) = state.agents.get_mut(&claim.agent_id) {
                    agent.current_tasks.remove(&claim.task_id);
                    if agent.current_tasks.is_empty() {
                        agent.current_activity = AgentActivity::Idle;
                        agent.recompute_status();
                    }
                }
                outcome.expired_claims.push((claim.agent_id, claim.task_id));
            }

            if outcome.offlined.is_empty() {
                None
            } else {
                Some(state.agents.clone())
            }
        };

        for (agent_id, count) in &outcome.grace_entries {
            let activity = self.get(agent_id).map(|a| a.current_activity).unwrap_or(AgentActivity::Idle);
            warn!(agent = %agent_id, count, "agent entered grace period");
            self.emitter.emit(Event::AgentGracePeriod {
                agent_id: agent_id.clone(),
                activity,
                grace_period_count: *count,
                timestamp: now,
            });
        }
        for (agent_id, tasks) in &outcome.offlined {
            warn!(agent = %agent_id, released = tasks.len(), "agent marked offline");
            self.emitter.emit(Event::AgentOffline {
                agent_id: agent_id.clone(),
                released_tasks: tasks.clone(),
                timestamp: now,
            });
        }
        for (agent_id, task_id) in &outcome.expired_claims {
            self.emitter.emit(Event::ClaimReleased {
                task_id: task_id.clone(),
                agent_id: agent_id.clone(),
                reason: "claim expired without progress".to_string(),
                timestamp: now,
            });
        }
        if let Some(snapshot) = snapshot {
            self.persist(&snapshot);
        }
        outcome
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<Agent> {
        self.state.lock().agents.get(agent_id).cloned()
    }

    pub fn agents(&self) -> Vec<Agent> {
        let mut list: Vec<Agent> = self.state.lock().agents.values().cloned().collect();
        list.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        list
    }

    pub fn claim_of(&self, task_id: &TaskId) -> Option<Claim> {
        self.state.lock().claims.get(task_id).cloned()
    }

    pub fn agent_count(&self) -> usize {
        self.state.lock().agents.len()
    }

    fn persist(&self, agents: &HashMap<AgentId, Agent>) {
        if let Err(e) = self.store.save(agents) {
            warn!(error = %e, "agent registry persist failed");
        }
    }

    fn unknown_agent(&self, agent_id: &AgentId) -> Error {
        Error::not_found("agent", agent_id).with_context(
            ErrorContext::new("registry", "lookup").entity(agent_id.as_str()),
        )
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
