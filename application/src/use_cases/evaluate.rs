//! Evaluate use case.
//!
//! Quorum timeouts are never fired by a timer. A proposal expires when
//! somebody evaluates it after its deadline, either here or on the next
//! vote arrival.

use super::governance::{GovernanceError, Resolution, resolve_proposal};
use crate::context::AppContext;
use agora_domain::{ProposalId, ProposalStatus};

pub struct EvaluateUseCase {
    ctx: AppContext,
}

impl EvaluateUseCase {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Evaluate one proposal, committing and publishing a terminal outcome
    pub async fn execute(
        &self,
        id: &ProposalId,
        pool_size: Option<usize>,
    ) -> Result<Resolution, GovernanceError> {
        let _guard = self.ctx.write_guard().await;
        resolve_proposal(&self.ctx, id, pool_size, true).await
    }

    /// Evaluate every pending proposal of a group (or of all groups)
    pub async fn sweep(
        &self,
        group: Option<&str>,
        pool_size: Option<usize>,
    ) -> Result<Vec<Resolution>, GovernanceError> {
        let _guard = self.ctx.write_guard().await;
        let pending = self
            .ctx
            .knowledge
            .list_proposals(group, Some(ProposalStatus::Pending))
            .await?;

        let mut resolutions = Vec::with_capacity(pending.len());
        for proposal in pending {
            resolutions.push(resolve_proposal(&self.ctx, &proposal.id, pool_size, true).await?);
        }
        Ok(resolutions)
    }
}
