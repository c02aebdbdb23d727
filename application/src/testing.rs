//! In-crate fakes for use case tests

use crate::config::AgoraConfig;
use crate::context::AppContext;
use crate::ports::audit_logger::{AuditEvent, AuditLogger};
use crate::ports::cascade_store::CascadeStore;
use crate::ports::clock::Clock;
use crate::ports::knowledge_store::{KnowledgeStore, StoreError};
use crate::ports::transport::{Transport, TransportError};
use agora_domain::knowledge::resolve_fact_write;
use agora_domain::{
    AgentId, CascadeTask, CascadeTransition, Decision, Fact, FactKey, FactWriteOutcome,
    GovernancePolicy, IdempotencyKey, Proposal, ProposalId, ProposalStatus, RosterMember, TraceId,
    TransitionOutcome, Vote,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Clock the test can move forward
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// `(topic, key, encoded envelope)` per produced message
type Sent = (String, String, Vec<u8>);

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: AtomicBool,
}

impl RecordingTransport {
    pub fn topics(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, k, _)| k.clone()).collect()
    }

    /// Encoded envelopes produced on `topic`, in order
    pub fn payloads_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, _, bytes)| bytes.clone())
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn produce(
        &self,
        topic: &str,
        key: &IdempotencyKey,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("broker down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingAudit {
    pub fn types(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl AuditLogger for RecordingAudit {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type.to_string(), event.payload));
    }
}

#[derive(Default)]
struct MemoryState {
    proposals: Vec<Proposal>,
    votes: BTreeMap<ProposalId, BTreeMap<AgentId, Vote>>,
    facts: BTreeMap<FactKey, Vec<Fact>>,
    latest: BTreeMap<FactKey, Fact>,
    roster: Vec<RosterMember>,
    applied: HashSet<IdempotencyKey>,
    tasks: Vec<CascadeTask>,
    transitions: Vec<CascadeTransition>,
}

/// Minimal in-memory store implementing both store ports
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn put_fact(&self, fact: Fact) {
        let mut state = self.state.lock().unwrap();
        state.latest.insert(fact.key(), fact.clone());
        state.facts.entry(fact.key()).or_default().push(fact);
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn create_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.proposals.iter().any(|p| p.id == proposal.id) {
            return Err(StoreError::duplicate("proposal", proposal.id.as_str()));
        }
        state.proposals.push(proposal.clone());
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .proposals
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("proposal", id.as_str()))
    }

    async fn list_proposals(
        &self,
        group: Option<&str>,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .proposals
            .iter()
            .filter(|p| group.is_none_or(|g| p.group == g))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect())
    }

    async fn update_proposal_decision(
        &self,
        id: &ProposalId,
        decision: &Decision,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let proposal = state
            .proposals
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::not_found("proposal", id.as_str()))?;
        Ok(proposal.apply_decision(decision))
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let ballots = state.votes.entry(vote.proposal_id.clone()).or_default();
        if ballots.get(&vote.voter).is_some_and(|stored| !vote.supersedes(stored)) {
            return Ok(false);
        }
        ballots.insert(vote.voter.clone(), vote.clone());
        Ok(true)
    }

    async fn list_votes(&self, proposal_id: &ProposalId) -> Result<Vec<Vote>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .votes
            .get(proposal_id)
            .map(|v| v.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_fact_latest(&self, key: &FactKey) -> Result<Option<Fact>, StoreError> {
        Ok(self.state.lock().unwrap().latest.get(key).cloned())
    }

    async fn upsert_fact_latest(&self, fact: &Fact) -> Result<FactWriteOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        let outcome = resolve_fact_write(state.latest.get(&fact.key()), fact);
        if outcome.incoming_is_latest() {
            state.latest.insert(fact.key(), fact.clone());
            state.facts.entry(fact.key()).or_default().push(fact.clone());
        }
        Ok(outcome)
    }

    async fn list_facts(&self, group: Option<&str>) -> Result<Vec<Fact>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .latest
            .values()
            .filter(|f| group.is_none_or(|g| f.group == g))
            .cloned()
            .collect())
    }

    async fn fact_history(&self, key: &FactKey) -> Result<Vec<Fact>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .facts
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_facts(&self, group: Option<&str>) -> Result<usize, StoreError> {
        Ok(self.list_facts(group).await?.len())
    }

    async fn list_group_members(&self, group: &str) -> Result<Vec<RosterMember>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .roster
            .iter()
            .filter(|m| m.group == group)
            .cloned()
            .collect())
    }

    async fn record_presence(
        &self,
        group: &str,
        agent: &AgentId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        match state
            .roster
            .iter_mut()
            .find(|m| m.group == group && &m.agent == agent)
        {
            Some(member) => member.last_seen = member.last_seen.max(seen_at),
            None => state
                .roster
                .push(RosterMember::new(group, agent.clone(), seen_at)),
        }
        Ok(())
    }

    async fn record_capabilities(
        &self,
        group: &str,
        agent: &AgentId,
        capabilities: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record_presence(group, agent, seen_at).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(member) = state
            .roster
            .iter_mut()
            .find(|m| m.group == group && &m.agent == agent)
        {
            member.capabilities = capabilities.to_vec();
        }
        Ok(())
    }

    async fn is_applied(&self, key: &IdempotencyKey) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().applied.contains(key))
    }

    async fn mark_applied(&self, key: &IdempotencyKey) -> Result<(), StoreError> {
        self.state.lock().unwrap().applied.insert(key.clone());
        Ok(())
    }
}

#[async_trait]
impl CascadeStore for MemoryStore {
    async fn create_cascade_task(&self, task: &CascadeTask) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.tasks.iter().any(|t| {
            t.trace_id == task.trace_id && (t.task_id == task.task_id || t.sequence == task.sequence)
        }) {
            return Err(StoreError::duplicate("cascade task", &task.task_id));
        }
        state.tasks.push(task.clone());
        Ok(())
    }

    async fn get_cascade_task(
        &self,
        trace_id: &TraceId,
        task_id: &str,
    ) -> Result<CascadeTask, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .tasks
            .iter()
            .find(|t| &t.trace_id == trace_id && t.task_id == task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("cascade task", task_id))
    }

    async fn advance_cascade_task(
        &self,
        transition: CascadeTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        let original = state
            .transitions
            .iter()
            .find(|t| {
                t.trace_id == transition.trace_id
                    && t.task_id == transition.task_id
                    && t.idempotency_key == transition.idempotency_key
            })
            .cloned();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.trace_id == transition.trace_id && t.task_id == transition.task_id)
            .ok_or_else(|| StoreError::not_found("cascade task", &transition.task_id))?;

        if let Some(original) = original {
            return Ok(TransitionOutcome {
                transition: original,
                task: task.clone(),
                replayed: true,
            });
        }
        if task.status != transition.from {
            return Err(StoreError::StateConflict {
                id: task.task_id.clone(),
                expected: transition.from.to_string(),
                actual: task.status.to_string(),
            });
        }
        task.apply_transition(&transition)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let task = task.clone();
        state.transitions.push(transition.clone());
        Ok(TransitionOutcome {
            transition,
            task,
            replayed: false,
        })
    }

    async fn list_cascade_tasks(
        &self,
        trace_id: &TraceId,
        include_archived: bool,
    ) -> Result<Vec<CascadeTask>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut tasks: Vec<_> = state
            .tasks
            .iter()
            .filter(|t| &t.trace_id == trace_id && (include_archived || !t.is_archived()))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sequence);
        Ok(tasks)
    }

    async fn list_cascade_transitions(
        &self,
        trace_id: &TraceId,
        task_id: Option<&str>,
    ) -> Result<Vec<CascadeTransition>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .transitions
            .iter()
            .filter(|t| &t.trace_id == trace_id && task_id.is_none_or(|id| t.task_id == id))
            .cloned()
            .collect())
    }
}

/// Everything a use case test needs, wired together
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub audit: Arc<RecordingAudit>,
    pub clock: Arc<ManualClock>,
    pub ctx: AppContext,
}

impl Harness {
    /// Node `scout:1` with the default policy
    pub fn new() -> Self {
        Self::with_config(AgoraConfig::new(
            AgentId::new("scout:1"),
            GovernancePolicy::default(),
        ))
    }

    pub fn with_config(config: AgoraConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let audit = Arc::new(RecordingAudit::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let ctx = AppContext::new(store.clone(), store.clone(), transport.clone(), config)
            .with_clock(clock.clone())
            .with_audit_logger(audit.clone());
        Self {
            store,
            transport,
            audit,
            clock,
            ctx,
        }
    }

    /// The same node seen under another identity
    pub fn as_agent(&self, agent: &str) -> AppContext {
        let mut ctx = self.ctx.clone();
        ctx.config = ctx.config.clone().with_identity(agent);
        ctx
    }
}
