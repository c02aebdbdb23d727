//! Read-only views over the knowledge store

use super::governance::GovernanceError;
use crate::context::AppContext;
use agora_domain::knowledge::{ballot_summary, ballots_from_votes, count_active, estimate_pool_size};
use agora_domain::{Fact, FactKey, Proposal, ProposalId, ProposalStatus, RosterMember, Vote};
use serde::Serialize;

/// A proposal with its ballots
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub votes: Vec<Vote>,
    /// e.g. `[●●○]`
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub expired: usize,
}

impl StatusCounts {
    fn add(&mut self, status: ProposalStatus) {
        match status {
            ProposalStatus::Pending => self.pending += 1,
            ProposalStatus::Approved => self.approved += 1,
            ProposalStatus::Rejected => self.rejected += 1,
            ProposalStatus::Expired => self.expired += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.expired
    }
}

/// Snapshot of one group as seen by this node
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub group: String,
    pub identity: String,
    pub policy: String,
    pub proposals: StatusCounts,
    pub facts: usize,
    pub members: Vec<RosterMember>,
    pub active_members: usize,
    pub estimated_pool: usize,
}

pub struct GovernanceQueries {
    ctx: AppContext,
}

impl GovernanceQueries {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn proposals(
        &self,
        group: Option<&str>,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, GovernanceError> {
        Ok(self.ctx.knowledge.list_proposals(group, status).await?)
    }

    pub async fn proposal(&self, id: &ProposalId) -> Result<ProposalView, GovernanceError> {
        let proposal = self.ctx.knowledge.get_proposal(id).await?;
        let votes = self.ctx.knowledge.list_votes(id).await?;
        let summary = ballot_summary(&ballots_from_votes(&votes));
        Ok(ProposalView {
            proposal,
            votes,
            summary,
        })
    }

    /// Proposals that reached a terminal status
    pub async fn decisions(&self, group: Option<&str>) -> Result<Vec<Proposal>, GovernanceError> {
        let proposals = self.ctx.knowledge.list_proposals(group, None).await?;
        Ok(proposals
            .into_iter()
            .filter(|p| p.status.is_terminal())
            .collect())
    }

    pub async fn facts(&self, group: Option<&str>) -> Result<Vec<Fact>, GovernanceError> {
        Ok(self.ctx.knowledge.list_facts(group).await?)
    }

    pub async fn fact_history(&self, key: &FactKey) -> Result<Vec<Fact>, GovernanceError> {
        Ok(self.ctx.knowledge.fact_history(key).await?)
    }

    pub async fn status(&self, group: Option<&str>) -> Result<StatusReport, GovernanceError> {
        let ctx = &self.ctx;
        let group = ctx.config.group_or_default(group).to_string();

        let mut counts = StatusCounts::default();
        for proposal in ctx.knowledge.list_proposals(Some(&group), None).await? {
            counts.add(proposal.status);
        }

        let members = ctx.knowledge.list_group_members(&group).await?;
        let active = count_active(&members, ctx.clock.now(), ctx.config.presence_window());

        Ok(StatusReport {
            identity: ctx.config.identity().to_string(),
            policy: ctx.config.policy().description(),
            proposals: counts,
            facts: ctx.knowledge.count_facts(Some(&group)).await?,
            estimated_pool: estimate_pool_size(None, active, ctx.config.policy()),
            active_members: active,
            members,
            group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, t0};
    use crate::ports::knowledge_store::KnowledgeStore;
    use crate::use_cases::cast_vote::{CastVoteInput, CastVoteUseCase};
    use crate::use_cases::propose::{ProposeInput, ProposeUseCase};
    use agora_domain::{AgentId, VoteValue};

    #[tokio::test]
    async fn test_status_counts_and_roster() {
        let h = Harness::new();
        let propose = ProposeUseCase::new(h.as_agent("lead:1"));
        let approved = propose
            .execute(ProposeInput::new("", "a").with_group("ops"))
            .await
            .unwrap()
            .proposal
            .id;
        propose
            .execute(ProposeInput::new("", "b").with_group("ops"))
            .await
            .unwrap();
        for voter in ["scout:2", "scout:3"] {
            CastVoteUseCase::new(h.as_agent(voter))
                .execute(CastVoteInput::new(approved.clone(), VoteValue::Yes))
                .await
                .unwrap();
            h.store
                .record_presence("ops", &AgentId::new(voter), t0())
                .await
                .unwrap();
        }

        let queries = GovernanceQueries::new(h.ctx.clone());
        let report = queries.status(Some("ops")).await.unwrap();
        assert_eq!(report.proposals.pending, 1);
        assert_eq!(report.proposals.approved, 1);
        assert_eq!(report.proposals.total(), 2);
        assert_eq!(report.facts, 1);
        assert_eq!(report.active_members, 2);
        assert_eq!(report.estimated_pool, 2);

        let decisions = queries.decisions(Some("ops")).await.unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].id, approved);

        let view = queries.proposal(&approved).await.unwrap();
        assert_eq!(view.votes.len(), 2);
        assert_eq!(view.summary, "[●●]");
    }

    #[tokio::test]
    async fn test_idle_members_fall_back_to_min_pool() {
        let h = Harness::new();
        h.store
            .record_presence("ops", &AgentId::new("scout:2"), t0())
            .await
            .unwrap();
        h.clock.advance(3600);

        let report = GovernanceQueries::new(h.ctx.clone())
            .status(Some("ops"))
            .await
            .unwrap();
        assert_eq!(report.members.len(), 1);
        assert_eq!(report.active_members, 0);
        assert_eq!(report.estimated_pool, 3);
    }
}
