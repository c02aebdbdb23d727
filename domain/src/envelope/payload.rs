//! Envelope payloads, one typed struct per envelope type.

use super::topic::TopicKind;
use crate::core::error::DomainError;
use crate::core::identity::{AgentId, TraceId};
use crate::knowledge::{Decision, Fact, Proposal, ProposalId, ProposalStatus, Vote, VoteValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope `type` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
    Proposal,
    Vote,
    Decision,
    Fact,
    Presence,
    Capabilities,
}

impl EnvelopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeType::Proposal => "proposal",
            EnvelopeType::Vote => "vote",
            EnvelopeType::Decision => "decision",
            EnvelopeType::Fact => "fact",
            EnvelopeType::Presence => "presence",
            EnvelopeType::Capabilities => "capabilities",
        }
    }

    /// Topic this type is published on
    pub fn topic_kind(&self) -> TopicKind {
        match self {
            EnvelopeType::Proposal => TopicKind::Proposals,
            EnvelopeType::Vote => TopicKind::Votes,
            EnvelopeType::Decision => TopicKind::Decisions,
            EnvelopeType::Fact => TopicKind::Facts,
            EnvelopeType::Presence => TopicKind::Presence,
            EnvelopeType::Capabilities => TopicKind::Capabilities,
        }
    }

    pub fn all() -> [EnvelopeType; 6] {
        [
            EnvelopeType::Proposal,
            EnvelopeType::Vote,
            EnvelopeType::Decision,
            EnvelopeType::Fact,
            EnvelopeType::Presence,
            EnvelopeType::Capabilities,
        ]
    }
}

impl std::fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EnvelopeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvelopeType::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::UnknownEnvelopeType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPayload {
    pub proposal_id: ProposalId,
    pub group: String,
    #[serde(default)]
    pub title: String,
    pub statement: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub proposer_id: AgentId,
    pub created_at: DateTime<Utc>,
}

impl ProposalPayload {
    /// Rebuild the pending proposal this payload announces
    pub fn to_proposal(&self) -> Proposal {
        Proposal::new(
            self.group.clone(),
            self.title.clone(),
            self.statement.clone(),
            self.proposer_id.clone(),
            self.created_at,
        )
        .with_id(self.proposal_id.clone())
        .with_tags(self.tags.clone())
    }
}

impl From<&Proposal> for ProposalPayload {
    fn from(p: &Proposal) -> Self {
        Self {
            proposal_id: p.id.clone(),
            group: p.group.clone(),
            title: p.title.clone(),
            statement: p.statement.clone(),
            tags: p.tags.clone(),
            proposer_id: p.proposer.clone(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub proposal_id: ProposalId,
    pub voter_id: AgentId,
    pub value: VoteValue,
    #[serde(default)]
    pub reason: String,
    /// 0 for the first ballot, bumped on every change of mind
    #[serde(default)]
    pub revision: u32,
}

impl VotePayload {
    pub fn to_vote(&self, trace_id: TraceId) -> Vote {
        Vote::new(
            self.proposal_id.clone(),
            self.voter_id.clone(),
            self.value,
            self.reason.clone(),
        )
        .with_trace_id(trace_id)
        .with_revision(self.revision)
    }
}

impl From<&Vote> for VotePayload {
    fn from(v: &Vote) -> Self {
        Self {
            proposal_id: v.proposal_id.clone(),
            voter_id: v.voter.clone(),
            value: v.value,
            reason: v.reason.clone(),
            revision: v.revision,
        }
    }
}

/// `{proposalId, outcome, yes, no, reason}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    pub proposal_id: ProposalId,
    pub outcome: ProposalStatus,
    pub yes: usize,
    pub no: usize,
    #[serde(default)]
    pub reason: String,
}

impl DecisionPayload {
    pub fn new(proposal_id: ProposalId, decision: &Decision) -> Self {
        Self {
            proposal_id,
            outcome: decision.status,
            yes: decision.yes,
            no: decision.no,
            reason: decision.reason.clone(),
        }
    }

    pub fn to_decision(&self) -> Decision {
        Decision::new(self.outcome, self.yes, self.no, self.reason.clone())
    }
}

/// A derived fact as served by the sending node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactPayload {
    pub fact_id: String,
    pub group: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub version: u64,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FactPayload {
    pub fn to_fact(&self) -> Fact {
        Fact {
            id: self.fact_id.clone(),
            group: self.group.clone(),
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
            version: self.version,
            source: self.source.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<&Fact> for FactPayload {
    fn from(f: &Fact) -> Self {
        Self {
            fact_id: f.id.clone(),
            group: f.group.clone(),
            subject: f.subject.clone(),
            predicate: f.predicate.clone(),
            object: f.object.clone(),
            version: f.version,
            source: f.source.clone(),
            tags: f.tags.clone(),
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub group: String,
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesPayload {
    pub group: String,
    pub agent_id: AgentId,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Tagged union of all payloads; the variant determines the envelope type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Proposal(ProposalPayload),
    Vote(VotePayload),
    Decision(DecisionPayload),
    Fact(FactPayload),
    Presence(PresencePayload),
    Capabilities(CapabilitiesPayload),
}

impl Payload {
    pub fn envelope_type(&self) -> EnvelopeType {
        match self {
            Payload::Proposal(_) => EnvelopeType::Proposal,
            Payload::Vote(_) => EnvelopeType::Vote,
            Payload::Decision(_) => EnvelopeType::Decision,
            Payload::Fact(_) => EnvelopeType::Fact,
            Payload::Presence(_) => EnvelopeType::Presence,
            Payload::Capabilities(_) => EnvelopeType::Capabilities,
        }
    }

    /// Group the payload belongs to, when it names one directly
    pub fn group(&self) -> Option<&str> {
        match self {
            Payload::Proposal(p) => Some(&p.group),
            Payload::Fact(f) => Some(&f.group),
            Payload::Presence(p) => Some(&p.group),
            Payload::Capabilities(p) => Some(&p.group),
            Payload::Vote(_) | Payload::Decision(_) => None,
        }
    }

    /// Field-level checks beyond what deserialization enforces
    pub fn validate(&self) -> Result<(), DomainError> {
        let require = |value: &str, field: &str| {
            if value.trim().is_empty() {
                Err(DomainError::validation(format!(
                    "{} payload: {} is required",
                    self.envelope_type(),
                    field
                )))
            } else {
                Ok(())
            }
        };

        match self {
            Payload::Proposal(p) => {
                require(p.proposal_id.as_str(), "proposalId")?;
                require(&p.group, "group")?;
                require(&p.statement, "statement")
            }
            Payload::Vote(v) => {
                require(v.proposal_id.as_str(), "proposalId")?;
                require(v.voter_id.as_str(), "voterId")
            }
            Payload::Decision(d) => {
                require(d.proposal_id.as_str(), "proposalId")?;
                if !d.outcome.is_terminal() {
                    return Err(DomainError::validation(
                        "decision payload: outcome must be terminal",
                    ));
                }
                Ok(())
            }
            Payload::Fact(f) => {
                require(&f.group, "group")?;
                require(&f.subject, "subject")?;
                require(&f.predicate, "predicate")?;
                require(&f.source, "source")?;
                if f.version == 0 {
                    return Err(DomainError::validation(
                        "fact payload: version starts at 1",
                    ));
                }
                Ok(())
            }
            Payload::Presence(p) => {
                require(&p.group, "group")?;
                require(p.agent_id.as_str(), "agentId")
            }
            Payload::Capabilities(c) => {
                require(&c.group, "group")?;
                require(c.agent_id.as_str(), "agentId")
            }
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, DomainError> {
        let value = match self {
            Payload::Proposal(p) => serde_json::to_value(p),
            Payload::Vote(v) => serde_json::to_value(v),
            Payload::Decision(d) => serde_json::to_value(d),
            Payload::Fact(f) => serde_json::to_value(f),
            Payload::Presence(p) => serde_json::to_value(p),
            Payload::Capabilities(c) => serde_json::to_value(c),
        };
        value.map_err(|e| DomainError::Decode(e.to_string()))
    }
}
