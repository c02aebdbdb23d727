//! Propose use case: register a proposal and announce it to the group.

use super::governance::{GovernanceError, ensure_enabled, proposal_trace};
use crate::context::AppContext;
use crate::ports::knowledge_store::StoreError;
use agora_domain::envelope::ProposalPayload;
use agora_domain::{IdempotencyKey, Payload, Proposal, ProposalId};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ProposeInput {
    /// Falls back to the configured default group
    pub group: Option<String>,
    pub title: String,
    pub statement: String,
    pub tags: Vec<String>,
    /// Supply an id to retry a proposal whose publish failed
    pub id: Option<ProposalId>,
}

impl ProposeInput {
    pub fn new(title: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            statement: statement.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_id(mut self, id: impl Into<ProposalId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposeOutput {
    pub proposal: Proposal,
    pub topic: String,
    pub idempotency_key: IdempotencyKey,
    /// The proposal already existed with identical content
    pub replayed: bool,
}

pub struct ProposeUseCase {
    ctx: AppContext,
}

impl ProposeUseCase {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, input: ProposeInput) -> Result<ProposeOutput, GovernanceError> {
        ensure_enabled(&self.ctx)?;

        let group = self.ctx.config.group_or_default(input.group.as_deref());
        let mut proposal = Proposal::new(
            group,
            input.title,
            input.statement,
            self.ctx.config.identity().clone(),
            self.ctx.clock.now(),
        )
        .with_tags(input.tags);
        if let Some(id) = input.id {
            proposal = proposal.with_id(id);
        }
        proposal.validate()?;

        let key = IdempotencyKey::proposal(proposal.id.as_str());
        let replayed = {
            let _guard = self.ctx.write_guard().await;
            match self.ctx.knowledge.create_proposal(&proposal).await {
                Ok(()) => {
                    // our own envelope echoing back must not re-apply
                    self.ctx.knowledge.mark_applied(&key).await?;
                    false
                }
                Err(StoreError::Duplicate { .. }) => {
                    let stored = self.ctx.knowledge.get_proposal(&proposal.id).await?;
                    if !same_content(&stored, &proposal) {
                        return Err(StoreError::duplicate("proposal", proposal.id.as_str()).into());
                    }
                    debug!("Proposal {} already registered; re-publishing", stored.id);
                    proposal = stored;
                    true
                }
                Err(e) => return Err(e.into()),
            }
        };
        if !replayed {
            info!("Proposal {} created in {}", proposal.id, proposal.group);
        }

        let envelope = self.ctx.envelope(
            Payload::Proposal(ProposalPayload::from(&proposal)),
            key.clone(),
            proposal_trace(&proposal.id),
        );
        let topic = self
            .ctx
            .publish(&proposal.group, &envelope)
            .await
            .map_err(|source| GovernanceError::Publish {
                key: key.clone(),
                source,
            })?;

        Ok(ProposeOutput {
            proposal,
            topic,
            idempotency_key: key,
            replayed,
        })
    }
}

fn same_content(a: &Proposal, b: &Proposal) -> bool {
    a.group == b.group
        && a.title == b.title
        && a.statement == b.statement
        && a.tags == b.tags
        && a.proposer == b.proposer
}
