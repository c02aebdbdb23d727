//! Ingest use case: apply envelopes received from peers.
//!
//! Every envelope is checked against the seen-set before any side effect.
//! A replayed key is acknowledged without re-applying anything.

use super::governance::{
    GovernanceError, Resolution, commit_decision, ensure_enabled, record_fact_outcome,
    resolve_proposal,
};
use crate::context::AppContext;
use crate::ports::knowledge_store::StoreError;
use agora_domain::{Envelope, EnvelopeType, IdempotencyKey, Payload};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What happened to one envelope
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Applied {
        kind: EnvelopeType,
        key: IdempotencyKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolution: Option<Box<Resolution>>,
    },
    Replayed {
        kind: EnvelopeType,
        key: IdempotencyKey,
    },
}

impl IngestOutcome {
    pub fn is_replay(&self) -> bool {
        matches!(self, IngestOutcome::Replayed { .. })
    }
}

/// Per-line result of ingesting a JSONL batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub applied: usize,
    pub replayed: usize,
    /// `(line number, error message)` of rejected lines
    pub rejected: Vec<(usize, String)>,
    pub outcomes: Vec<IngestOutcome>,
}

pub struct IngestUseCase {
    ctx: AppContext,
}

impl IngestUseCase {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Decode and apply one encoded envelope
    pub async fn ingest_bytes(&self, bytes: &[u8]) -> Result<IngestOutcome, GovernanceError> {
        let envelope = self.ctx.codec.decode(bytes)?;
        self.ingest(envelope).await
    }

    /// Apply every non-blank line of a JSONL document.
    ///
    /// A rejected line does not stop the batch.
    pub async fn ingest_lines(&self, content: &str) -> IngestReport {
        let mut report = IngestReport::default();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match self.ingest_bytes(line.as_bytes()).await {
                Ok(outcome) => {
                    if outcome.is_replay() {
                        report.replayed += 1;
                    } else {
                        report.applied += 1;
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!("Rejected envelope on line {}: {}", index + 1, e);
                    report.rejected.push((index + 1, e.to_string()));
                }
            }
        }
        report
    }

    pub async fn ingest(&self, envelope: Envelope) -> Result<IngestOutcome, GovernanceError> {
        let kind = envelope.kind();
        if matches!(
            kind,
            EnvelopeType::Proposal
                | EnvelopeType::Vote
                | EnvelopeType::Decision
                | EnvelopeType::Fact
        ) {
            ensure_enabled(&self.ctx)?;
        }

        let _guard = self.ctx.write_guard().await;
        let key = envelope.idempotency_key.clone();

        if self.ctx.knowledge.is_applied(&key).await? {
            debug!("Replay of {} ignored", key);
            return Ok(IngestOutcome::Replayed { kind, key });
        }

        let resolution = self.apply(envelope).await?;
        self.ctx.knowledge.mark_applied(&key).await?;

        Ok(IngestOutcome::Applied {
            kind,
            key,
            resolution: resolution.map(Box::new),
        })
    }

    async fn apply(&self, envelope: Envelope) -> Result<Option<Resolution>, GovernanceError> {
        let ctx = &self.ctx;
        match envelope.payload {
            Payload::Proposal(payload) => {
                let proposal = payload.to_proposal();
                proposal.validate()?;
                match ctx.knowledge.create_proposal(&proposal).await {
                    Ok(()) => {
                        info!("Received proposal {} in {}", proposal.id, proposal.group);
                        // votes that overtook the proposal count now
                        let resolution = resolve_proposal(ctx, &proposal.id, None, false).await?;
                        Ok(Some(resolution))
                    }
                    Err(StoreError::Duplicate { .. }) => {
                        debug!("Proposal {} already known", proposal.id);
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Payload::Vote(payload) => {
                let vote = payload.to_vote(envelope.trace_id);
                if ctx.knowledge.upsert_vote(&vote).await? {
                    info!(
                        "Received vote {} from {} on {} (revision {})",
                        vote.value, vote.voter, vote.proposal_id, vote.revision
                    );
                } else {
                    debug!(
                        "Ignoring revision {} of {} on {}: a newer ballot is stored",
                        vote.revision, vote.voter, vote.proposal_id
                    );
                }

                // votes may arrive before their proposal
                match ctx.knowledge.get_proposal(&vote.proposal_id).await {
                    Ok(_) => Ok(Some(
                        resolve_proposal(ctx, &vote.proposal_id, None, false).await?,
                    )),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            Payload::Decision(payload) => {
                let proposal = ctx.knowledge.get_proposal(&payload.proposal_id).await?;
                let resolution =
                    commit_decision(ctx, proposal, payload.to_decision(), false).await?;
                Ok(Some(resolution))
            }
            Payload::Fact(payload) => {
                // a peer's fact is resolved against ours but never re-announced
                let fact = payload.to_fact();
                let outcome = ctx.knowledge.upsert_fact_latest(&fact).await?;
                record_fact_outcome(ctx, &fact, &outcome);
                Ok(None)
            }
            Payload::Presence(payload) => {
                ctx.knowledge
                    .record_presence(&payload.group, &payload.agent_id, envelope.timestamp)
                    .await?;
                debug!("Presence of {} in {}", payload.agent_id, payload.group);
                Ok(None)
            }
            Payload::Capabilities(payload) => {
                ctx.knowledge
                    .record_capabilities(
                        &payload.group,
                        &payload.agent_id,
                        &payload.capabilities,
                        envelope.timestamp,
                    )
                    .await?;
                debug!(
                    "Capabilities of {} in {}: {:?}",
                    payload.agent_id, payload.group, payload.capabilities
                );
                Ok(None)
            }
        }
    }
}
