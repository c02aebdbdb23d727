//! Knowledge store port
//!
//! Durable storage for proposals, votes, facts, the group roster and the
//! seen-set of applied idempotency keys.

use agora_domain::envelope::IdempotencyKey;
use agora_domain::{
    AgentId, Decision, Fact, FactKey, FactWriteOutcome, Proposal, ProposalId, ProposalStatus,
    RosterMember, Vote,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by store adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: &'static str, id: String },

    #[error("State conflict on {id}: expected {expected}, found {actual}")]
    StateConflict {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn duplicate(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::Duplicate {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Storage for the governance side.
///
/// Adapters must make each method atomic on its own; the application
/// serializes multi-step sequences with its own lock.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    // ==================== Proposals ====================

    /// Insert a pending proposal; fails with `Duplicate` if the id exists
    async fn create_proposal(&self, proposal: &Proposal) -> Result<(), StoreError>;

    async fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, StoreError>;

    /// Proposals ordered by creation time
    async fn list_proposals(
        &self,
        group: Option<&str>,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, StoreError>;

    /// Write a terminal decision once.
    ///
    /// Returns `Ok(false)` when the proposal had already left `pending`.
    async fn update_proposal_decision(
        &self,
        id: &ProposalId,
        decision: &Decision,
    ) -> Result<bool, StoreError>;

    // ==================== Votes ====================

    /// Insert or replace the vote of `vote.voter` on `vote.proposal_id`.
    ///
    /// A stored ballot with a higher revision is kept; returns whether
    /// `vote` was stored.
    async fn upsert_vote(&self, vote: &Vote) -> Result<bool, StoreError>;

    async fn list_votes(&self, proposal_id: &ProposalId) -> Result<Vec<Vote>, StoreError>;

    // ==================== Facts ====================

    async fn get_fact_latest(&self, key: &FactKey) -> Result<Option<Fact>, StoreError>;

    /// Resolve `fact` against the stored latest version and keep the winner
    async fn upsert_fact_latest(&self, fact: &Fact) -> Result<FactWriteOutcome, StoreError>;

    /// Latest version of every fact line
    async fn list_facts(&self, group: Option<&str>) -> Result<Vec<Fact>, StoreError>;

    /// Every accepted version of one fact line, oldest first
    async fn fact_history(&self, key: &FactKey) -> Result<Vec<Fact>, StoreError>;

    async fn count_facts(&self, group: Option<&str>) -> Result<usize, StoreError>;

    // ==================== Roster ====================

    async fn list_group_members(&self, group: &str) -> Result<Vec<RosterMember>, StoreError>;

    async fn record_presence(
        &self,
        group: &str,
        agent: &AgentId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn record_capabilities(
        &self,
        group: &str,
        agent: &AgentId,
        capabilities: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ==================== Seen-set ====================

    async fn is_applied(&self, key: &IdempotencyKey) -> Result<bool, StoreError>;

    async fn mark_applied(&self, key: &IdempotencyKey) -> Result<(), StoreError>;
}
