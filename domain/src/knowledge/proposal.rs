//! Proposal entity
//!
//! A proposal is a statement an agent puts before its group for a vote.
//! Its status leaves `pending` at most once.

use super::evaluator::Decision;
use crate::core::error::DomainError;
use crate::core::identity::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random proposal id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProposalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProposalId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Waiting for quorum; re-checked on every vote arrival
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Timed out before either quorum was reached
    Expired,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }

    pub fn all() -> [ProposalStatus; 4] {
        [
            ProposalStatus::Pending,
            ProposalStatus::Approved,
            ProposalStatus::Rejected,
            ProposalStatus::Expired,
        ]
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ProposalStatus::Pending),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            "expired" => Ok(ProposalStatus::Expired),
            other => Err(format!(
                "Unknown proposal status: {}. Valid: pending, approved, rejected, expired",
                other
            )),
        }
    }
}

/// A statement put to a group vote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub id: ProposalId,
    pub group: String,
    pub title: String,
    pub statement: String,
    pub tags: Vec<String>,
    pub proposer: AgentId,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub yes: usize,
    pub no: usize,
    pub reason: String,
}

impl Proposal {
    /// Create a pending proposal with a fresh id
    pub fn new(
        group: impl Into<String>,
        title: impl Into<String>,
        statement: impl Into<String>,
        proposer: impl Into<AgentId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::generate(),
            group: group.into(),
            title: title.into(),
            statement: statement.into(),
            tags: Vec::new(),
            proposer: proposer.into(),
            status: ProposalStatus::Pending,
            created_at,
            yes: 0,
            no: 0,
            reason: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ProposalId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check the fields required before a proposal may be persisted
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::validation("proposal id is required"));
        }
        if self.group.trim().is_empty() {
            return Err(DomainError::validation("proposal group is required"));
        }
        if self.statement.trim().is_empty() {
            return Err(DomainError::validation("proposal statement is required"));
        }
        Ok(())
    }

    /// Apply a terminal decision.
    ///
    /// Returns `false` (and leaves the proposal untouched) when the decision
    /// is not terminal or the proposal has already left `pending`.
    pub fn apply_decision(&mut self, decision: &Decision) -> bool {
        if self.status.is_terminal() || !decision.status.is_terminal() {
            return false;
        }
        self.status = decision.status;
        self.yes = decision.yes;
        self.no = decision.no;
        self.reason = decision.reason.clone();
        true
    }

    /// Subject used when this proposal is turned into a fact
    pub fn fact_subject(&self) -> &str {
        if self.title.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.title
        }
    }
}
