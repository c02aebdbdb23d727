//! Decision and fact resolution shared by the governance use cases.
//!
//! ```text
//! votes ─▶ ballots ─▶ evaluate ─▶ terminal? ─▶ write-once decision
//!                                                  ├─▶ audit "decision"
//!                                                  ├─▶ approved: derive fact ─▶ resolve write ─▶ publish fact
//!                                                  └─▶ publish decision envelope
//! ```
//!
//! Facts are published by every node that derives one, including from an
//! ingested decision. Two nodes can number the same decisions differently;
//! the facts topic is where their versions meet the write policy.

use crate::context::AppContext;
use crate::ports::knowledge_store::StoreError;
use crate::ports::transport::TransportError;
use agora_domain::envelope::{DecisionPayload, FactPayload};
use agora_domain::knowledge::fact::STATES_PREDICATE;
use agora_domain::knowledge::{ballots_from_votes, count_active, estimate_pool_size};
use agora_domain::{
    Decision, DomainError, Fact, FactKey, FactWriteOutcome, IdempotencyKey, Payload, Proposal,
    ProposalId, ProposalStatus, TraceId, evaluate,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by governance use cases
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Governance is disabled for this node")]
    Disabled,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Proposal {id} is already {status}")]
    ProposalClosed {
        id: ProposalId,
        status: ProposalStatus,
    },

    #[error("Publish failed, retry with idempotency key {key}: {source}")]
    Publish {
        key: IdempotencyKey,
        #[source]
        source: TransportError,
    },
}

impl GovernanceError {
    /// Malformed input is never worth retrying
    pub fn is_validation(&self) -> bool {
        matches!(self, GovernanceError::Domain(e) if e.is_malformed_input())
    }
}

/// Fails with `Disabled` before any mutating governance call
pub(crate) fn ensure_enabled(ctx: &AppContext) -> Result<(), GovernanceError> {
    if ctx.config.policy().enabled {
        Ok(())
    } else {
        Err(GovernanceError::Disabled)
    }
}

/// Governance envelopes are traced by the proposal they concern
pub(crate) fn proposal_trace(id: &ProposalId) -> TraceId {
    TraceId::new(id.as_str())
}

/// A fact write attempted as a side effect of approval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactWrite {
    pub fact: Fact,
    pub outcome: FactWriteOutcome,
    /// Set when the fact envelope could not be published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,
}

/// Result of evaluating a proposal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub proposal: Proposal,
    pub decision: Decision,
    pub pool_size: usize,
    /// This call wrote the terminal decision
    pub persisted: bool,
    pub fact: Option<FactWrite>,
    /// Set when the decision envelope could not be published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,
}

/// Evaluate a proposal against its stored ballots and commit a terminal result.
///
/// Re-resolving an already terminal proposal changes nothing but, when
/// `publish` is set, re-publishes the decision under its original key.
pub(crate) async fn resolve_proposal(
    ctx: &AppContext,
    id: &ProposalId,
    pool_override: Option<usize>,
    publish: bool,
) -> Result<Resolution, GovernanceError> {
    let proposal = ctx.knowledge.get_proposal(id).await?;
    let now = ctx.clock.now();
    let policy = ctx.config.policy();

    let members = ctx.knowledge.list_group_members(&proposal.group).await?;
    let active = count_active(&members, now, ctx.config.presence_window());
    let pool_size = estimate_pool_size(pool_override, active, policy);

    if proposal.status.is_terminal() {
        let decision = stored_decision(&proposal);
        let publish_error = if publish {
            publish_decision(ctx, &proposal, &decision).await
        } else {
            None
        };
        return Ok(Resolution {
            proposal,
            decision,
            pool_size,
            persisted: false,
            fact: None,
            publish_error,
        });
    }

    let votes = ctx.knowledge.list_votes(id).await?;
    let ballots = ballots_from_votes(&votes);
    let decision = evaluate(
        &proposal.proposer,
        pool_size,
        &ballots,
        proposal.created_at,
        now,
        policy,
    );
    debug!(
        "Evaluated {} with pool {} and {} ballots: {}",
        id,
        pool_size,
        ballots.len(),
        decision
    );

    if !decision.is_terminal() {
        return Ok(Resolution {
            proposal,
            decision,
            pool_size,
            persisted: false,
            fact: None,
            publish_error: None,
        });
    }

    let mut resolution = commit_decision(ctx, proposal, decision, publish).await?;
    resolution.pool_size = pool_size;
    Ok(resolution)
}

/// Persist a terminal decision through the write-once path.
///
/// A late duplicate (the proposal already left `pending`) is ignored and the
/// stored decision is returned instead.
pub(crate) async fn commit_decision(
    ctx: &AppContext,
    mut proposal: Proposal,
    decision: Decision,
    publish: bool,
) -> Result<Resolution, GovernanceError> {
    let persisted = ctx
        .knowledge
        .update_proposal_decision(&proposal.id, &decision)
        .await?;

    if !persisted {
        let stored = ctx.knowledge.get_proposal(&proposal.id).await?;
        debug!(
            "Ignoring late {} decision for {}: already {}",
            decision.status, stored.id, stored.status
        );
        return Ok(Resolution {
            decision: stored_decision(&stored),
            proposal: stored,
            pool_size: 0,
            persisted: false,
            fact: None,
            publish_error: None,
        });
    }

    proposal.apply_decision(&decision);
    info!("Proposal {} {}", proposal.id, decision);
    ctx.audit(
        "decision",
        json!({
            "proposal_id": proposal.id,
            "group": proposal.group,
            "outcome": decision.status,
            "yes": decision.yes,
            "no": decision.no,
            "reason": decision.reason,
        }),
    );

    let fact = if decision.is_approved() {
        Some(derive_fact(ctx, &proposal).await?)
    } else {
        None
    };

    let publish_error = if publish {
        publish_decision(ctx, &proposal, &decision).await
    } else {
        None
    };

    Ok(Resolution {
        proposal,
        decision,
        pool_size: 0,
        persisted: true,
        fact,
        publish_error,
    })
}

/// Turn an approved proposal into the next version of its fact
async fn derive_fact(ctx: &AppContext, proposal: &Proposal) -> Result<FactWrite, GovernanceError> {
    let key = FactKey::new(&proposal.group, proposal.fact_subject(), STATES_PREDICATE);
    let latest = ctx.knowledge.get_fact_latest(&key).await?;
    let fact = Fact::from_proposal(proposal, latest.map(|f| f.version), ctx.clock.now());
    let outcome = ctx.knowledge.upsert_fact_latest(&fact).await?;
    record_fact_outcome(ctx, &fact, &outcome);

    let publish_error = if outcome.incoming_is_latest() {
        publish_fact(ctx, &fact, proposal_trace(&proposal.id)).await?
    } else {
        None
    };
    Ok(FactWrite {
        fact,
        outcome,
        publish_error,
    })
}

/// Key under which a fact version from one source travels
fn fact_key(fact: &Fact) -> IdempotencyKey {
    IdempotencyKey::fact(&fact.key().to_string(), fact.version, &fact.source)
}

/// Announce a locally derived fact.
///
/// The key is marked applied first so the node's own envelope comes back as
/// a replay. A transport failure is logged and returned as text.
async fn publish_fact(
    ctx: &AppContext,
    fact: &Fact,
    trace_id: TraceId,
) -> Result<Option<String>, GovernanceError> {
    let key = fact_key(fact);
    ctx.knowledge.mark_applied(&key).await?;
    let envelope = ctx.envelope(Payload::Fact(FactPayload::from(fact)), key, trace_id);
    Ok(ctx
        .publish(&fact.group, &envelope)
        .await
        .err()
        .map(|e| format!("{} (key {})", e, envelope.idempotency_key)))
}

/// Log a fact write; conflicts and stale writes also go to the audit trail
pub(crate) fn record_fact_outcome(ctx: &AppContext, fact: &Fact, outcome: &FactWriteOutcome) {
    match outcome {
        FactWriteOutcome::Applied { version } => {
            info!("Fact {} now at version {}", fact.key(), version);
        }
        FactWriteOutcome::Unchanged { version } => {
            debug!("Fact {} version {} already stored", fact.key(), version);
        }
        FactWriteOutcome::Conflict {
            version,
            winner,
            loser,
            ..
        } => {
            warn!(
                "Fact conflict on {} at version {}: {} wins over {}",
                fact.key(),
                version,
                winner,
                loser
            );
            ctx.audit(
                "fact_conflict",
                json!({"key": fact.key().to_string(), "fact": fact, "outcome": outcome}),
            );
        }
        FactWriteOutcome::Stale { incoming, latest } => {
            warn!(
                "Stale fact write on {}: version {} is behind {}",
                fact.key(),
                incoming,
                latest
            );
            ctx.audit(
                "fact_stale",
                json!({"key": fact.key().to_string(), "fact": fact, "outcome": outcome}),
            );
        }
    }
}

fn stored_decision(proposal: &Proposal) -> Decision {
    Decision::new(
        proposal.status,
        proposal.yes,
        proposal.no,
        proposal.reason.clone(),
    )
}

/// Publish a decision envelope; a failure is logged and returned as text
async fn publish_decision(
    ctx: &AppContext,
    proposal: &Proposal,
    decision: &Decision,
) -> Option<String> {
    let envelope = ctx.envelope(
        Payload::Decision(DecisionPayload::new(proposal.id.clone(), decision)),
        IdempotencyKey::decision(proposal.id.as_str()),
        proposal_trace(&proposal.id),
    );
    ctx.publish(&proposal.group, &envelope)
        .await
        .err()
        .map(|e| format!("{} (key {})", e, envelope.idempotency_key))
}
