//! In-memory state shared by the local store, serializable as one snapshot

use agora_application::StoreError;
use agora_domain::knowledge::resolve_fact_write;
use agora_domain::{
    AgentId, CascadeTask, CascadeTransition, Decision, Fact, FactKey, FactWriteOutcome,
    IdempotencyKey, Proposal, ProposalId, ProposalStatus, RosterMember, TraceId,
    TransitionOutcome, Vote,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Latest version of a fact line plus every version that was ever served
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FactLine {
    latest: Fact,
    history: Vec<Fact>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StoreState {
    proposals: Vec<Proposal>,
    votes: BTreeMap<ProposalId, BTreeMap<AgentId, Vote>>,
    /// Keyed by the fact key's `group/subject/predicate` form
    facts: BTreeMap<String, FactLine>,
    roster: Vec<RosterMember>,
    applied: BTreeSet<IdempotencyKey>,
    tasks: Vec<CascadeTask>,
    transitions: Vec<CascadeTransition>,
}

impl StoreState {
    // ==================== Proposals ====================

    pub fn create_proposal(&mut self, proposal: &Proposal) -> Result<(), StoreError> {
        if self.proposals.iter().any(|p| p.id == proposal.id) {
            return Err(StoreError::duplicate("proposal", proposal.id.as_str()));
        }
        self.proposals.push(proposal.clone());
        Ok(())
    }

    pub fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, StoreError> {
        self.proposals
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("proposal", id.as_str()))
    }

    pub fn list_proposals(
        &self,
        group: Option<&str>,
        status: Option<ProposalStatus>,
    ) -> Vec<Proposal> {
        let mut proposals: Vec<_> = self
            .proposals
            .iter()
            .filter(|p| group.is_none_or(|g| p.group == g))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        proposals
    }

    /// Returns whether the decision was written
    pub fn update_proposal_decision(
        &mut self,
        id: &ProposalId,
        decision: &Decision,
    ) -> Result<bool, StoreError> {
        let proposal = self
            .proposals
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::not_found("proposal", id.as_str()))?;
        Ok(proposal.apply_decision(decision))
    }

    // ==================== Votes ====================

    /// Returns whether the ballot was stored; an older revision is dropped
    pub fn upsert_vote(&mut self, vote: &Vote) -> bool {
        let ballots = self.votes.entry(vote.proposal_id.clone()).or_default();
        if ballots
            .get(&vote.voter)
            .is_some_and(|stored| !vote.supersedes(stored))
        {
            return false;
        }
        ballots.insert(vote.voter.clone(), vote.clone());
        true
    }

    pub fn list_votes(&self, proposal_id: &ProposalId) -> Vec<Vote> {
        self.votes
            .get(proposal_id)
            .map(|votes| votes.values().cloned().collect())
            .unwrap_or_default()
    }

    // ==================== Facts ====================

    pub fn get_fact_latest(&self, key: &FactKey) -> Option<Fact> {
        self.facts.get(&key.to_string()).map(|line| line.latest.clone())
    }

    pub fn upsert_fact_latest(&mut self, fact: &Fact) -> FactWriteOutcome {
        let key = fact.key().to_string();
        let outcome = resolve_fact_write(self.facts.get(&key).map(|line| &line.latest), fact);
        if outcome.incoming_is_latest() {
            match self.facts.get_mut(&key) {
                Some(line) => {
                    line.latest = fact.clone();
                    line.history.push(fact.clone());
                }
                None => {
                    self.facts.insert(
                        key,
                        FactLine {
                            latest: fact.clone(),
                            history: vec![fact.clone()],
                        },
                    );
                }
            }
        }
        outcome
    }

    pub fn list_facts(&self, group: Option<&str>) -> Vec<Fact> {
        self.facts
            .values()
            .map(|line| &line.latest)
            .filter(|f| group.is_none_or(|g| f.group == g))
            .cloned()
            .collect()
    }

    pub fn fact_history(&self, key: &FactKey) -> Vec<Fact> {
        self.facts
            .get(&key.to_string())
            .map(|line| line.history.clone())
            .unwrap_or_default()
    }

    // ==================== Roster ====================

    pub fn list_group_members(&self, group: &str) -> Vec<RosterMember> {
        let mut members: Vec<_> = self
            .roster
            .iter()
            .filter(|m| m.group == group)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.agent.cmp(&b.agent));
        members
    }

    fn member_mut(&mut self, group: &str, agent: &AgentId, seen_at: DateTime<Utc>) -> &mut RosterMember {
        let index = match self
            .roster
            .iter()
            .position(|m| m.group == group && &m.agent == agent)
        {
            Some(index) => index,
            None => {
                self.roster
                    .push(RosterMember::new(group, agent.clone(), seen_at));
                self.roster.len() - 1
            }
        };
        let member = &mut self.roster[index];
        // out-of-order presence never moves last_seen backwards
        member.last_seen = member.last_seen.max(seen_at);
        member
    }

    pub fn record_presence(&mut self, group: &str, agent: &AgentId, seen_at: DateTime<Utc>) {
        self.member_mut(group, agent, seen_at);
    }

    pub fn record_capabilities(
        &mut self,
        group: &str,
        agent: &AgentId,
        capabilities: &[String],
        seen_at: DateTime<Utc>,
    ) {
        self.member_mut(group, agent, seen_at).capabilities = capabilities.to_vec();
    }

    // ==================== Seen-set ====================

    pub fn is_applied(&self, key: &IdempotencyKey) -> bool {
        self.applied.contains(key)
    }

    /// Returns whether the key was new
    pub fn mark_applied(&mut self, key: &IdempotencyKey) -> bool {
        self.applied.insert(key.clone())
    }

    // ==================== Cascade ====================

    pub fn create_cascade_task(&mut self, task: &CascadeTask) -> Result<(), StoreError> {
        let clash = self.tasks.iter().any(|t| {
            t.trace_id == task.trace_id && (t.task_id == task.task_id || t.sequence == task.sequence)
        });
        if clash {
            return Err(StoreError::duplicate(
                "cascade task",
                format!("{}#{}", task.task_id, task.sequence),
            ));
        }
        self.tasks.push(task.clone());
        Ok(())
    }

    pub fn get_cascade_task(&self, trace_id: &TraceId, task_id: &str) -> Result<CascadeTask, StoreError> {
        self.tasks
            .iter()
            .find(|t| &t.trace_id == trace_id && t.task_id == task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("cascade task", task_id))
    }

    /// Replay check, then compare-and-set on the stored status
    pub fn advance_cascade_task(
        &mut self,
        transition: CascadeTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        let original = self
            .transitions
            .iter()
            .find(|t| {
                t.trace_id == transition.trace_id
                    && t.task_id == transition.task_id
                    && t.idempotency_key == transition.idempotency_key
            })
            .cloned();

        let task = self
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

        let mut updated = task.clone();
        updated
            .apply_transition(&transition)
            .map_err(|e| StoreError::StateConflict {
                id: task.task_id.clone(),
                expected: e.to_string(),
                actual: task.status.to_string(),
            })?;
        *task = updated.clone();
        self.transitions.push(transition.clone());

        Ok(TransitionOutcome {
            transition,
            task: updated,
            replayed: false,
        })
    }

    pub fn list_cascade_tasks(&self, trace_id: &TraceId, include_archived: bool) -> Vec<CascadeTask> {
        let mut tasks: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| &t.trace_id == trace_id)
            .filter(|t| include_archived || !t.is_archived())
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub fn list_cascade_transitions(
        &self,
        trace_id: &TraceId,
        task_id: Option<&str>,
    ) -> Vec<CascadeTransition> {
        self.transitions
            .iter()
            .filter(|t| &t.trace_id == trace_id)
            .filter(|t| task_id.is_none_or(|id| t.task_id == id))
            .cloned()
            .collect()
    }
}
