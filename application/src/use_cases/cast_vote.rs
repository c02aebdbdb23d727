//! Cast Vote use case.
//!
//! Records the local agent's ballot, announces it, and re-evaluates the
//! proposal. Casting the same ballot again is a replay: nothing is stored
//! twice but the envelope is re-published under its original key, which is
//! how a caller retries after a transport failure.

use super::governance::{GovernanceError, Resolution, ensure_enabled, proposal_trace, resolve_proposal};
use crate::context::AppContext;
use agora_domain::envelope::VotePayload;
use agora_domain::{AgentId, IdempotencyKey, Payload, ProposalId, Vote, VoteValue};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CastVoteInput {
    pub proposal_id: ProposalId,
    pub value: VoteValue,
    pub reason: String,
    /// Explicit voter pool size; otherwise estimated from the roster
    pub pool_size: Option<usize>,
}

impl CastVoteInput {
    pub fn new(proposal_id: impl Into<ProposalId>, value: VoteValue) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            value,
            reason: String::new(),
            pool_size: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_pool_size(mut self, pool_size: Option<usize>) -> Self {
        self.pool_size = pool_size;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CastVoteOutput {
    pub vote: Vote,
    pub idempotency_key: IdempotencyKey,
    pub topic: String,
    pub replayed: bool,
    pub resolution: Resolution,
}

pub struct CastVoteUseCase {
    ctx: AppContext,
}

impl CastVoteUseCase {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, input: CastVoteInput) -> Result<CastVoteOutput, GovernanceError> {
        ensure_enabled(&self.ctx)?;
        let ctx = &self.ctx;
        let voter = ctx.config.identity().clone();

        let _guard = ctx.write_guard().await;

        let proposal = ctx.knowledge.get_proposal(&input.proposal_id).await?;
        if proposal.status.is_terminal() {
            return Err(GovernanceError::ProposalClosed {
                id: proposal.id,
                status: proposal.status,
            });
        }

        let existing = ctx
            .knowledge
            .list_votes(&proposal.id)
            .await?
            .into_iter()
            .find(|v| v.voter == voter);
        let next_revision = self.next_revision(&proposal.id, &voter).await?;

        let replayed = existing
            .as_ref()
            .is_some_and(|v| v.value == input.value && v.reason == input.reason);
        let revision = match &existing {
            Some(stored) if replayed => stored.revision,
            _ => next_revision,
        };
        let vote = Vote::new(proposal.id.clone(), voter.clone(), input.value, input.reason)
            .with_trace_id(proposal_trace(&proposal.id))
            .with_revision(revision);
        let key = IdempotencyKey::revote(proposal.id.as_str(), voter.as_str(), revision);

        if replayed {
            debug!("Vote of {} on {} unchanged; re-publishing", voter, proposal.id);
        } else {
            if !ctx.knowledge.upsert_vote(&vote).await? {
                debug!("A newer ballot of {} on {} is already stored", voter, proposal.id);
            }
            ctx.knowledge.mark_applied(&key).await?;
            info!("{} voted {} on {}", voter, vote.value, proposal.id);
        }

        let envelope = ctx.envelope(
            Payload::Vote(VotePayload::from(&vote)),
            key.clone(),
            vote.trace_id.clone(),
        );
        let topic = ctx
            .publish(&proposal.group, &envelope)
            .await
            .map_err(|source| GovernanceError::Publish {
                key: key.clone(),
                source,
            })?;

        let resolution = resolve_proposal(ctx, &proposal.id, input.pool_size, true).await?;

        Ok(CastVoteOutput {
            vote,
            idempotency_key: key,
            topic,
            replayed,
            resolution,
        })
    }

    /// First revision whose key has not been applied yet
    async fn next_revision(
        &self,
        proposal_id: &ProposalId,
        voter: &AgentId,
    ) -> Result<u32, GovernanceError> {
        let mut revision = 0;
        while self
            .ctx
            .knowledge
            .is_applied(&IdempotencyKey::revote(
                proposal_id.as_str(),
                voter.as_str(),
                revision,
            ))
            .await?
        {
            revision += 1;
        }
        Ok(revision)
    }
}
