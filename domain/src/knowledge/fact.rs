//! Versioned facts and the write-resolution policy
//!
//! A fact is the accepted form of an approved proposal. Facts are keyed by
//! `(group, subject, predicate)`; only the latest version is served, older
//! versions are kept for audit.
//!
//! # Resolution
//!
//! ```text
//! incoming.version  >  latest.version  → Applied
//! incoming.version  == latest.version  → Conflict (smaller source wins)
//!                                        or Unchanged (same source: replay)
//! incoming.version  <  latest.version  → Stale (discarded)
//! ```

use super::proposal::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Predicate used for facts derived from proposals
pub const STATES_PREDICATE: &str = "states";

/// Identity of a fact line: all versions share the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactKey {
    pub group: String,
    pub subject: String,
    pub predicate: String,
}

impl FactKey {
    pub fn new(
        group: impl Into<String>,
        subject: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            subject: subject.into(),
            predicate: predicate.into(),
        }
    }
}

impl std::fmt::Display for FactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.subject, self.predicate)
    }
}

/// An accepted statement with a monotonically increasing version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub group: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub version: u64,
    pub source: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Fact {
    /// Derive the next version of the fact an approved proposal asserts.
    ///
    /// `latest_version` is the stored latest version for the same key, if any.
    pub fn from_proposal(
        proposal: &Proposal,
        latest_version: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group: proposal.group.clone(),
            subject: proposal.fact_subject().to_string(),
            predicate: STATES_PREDICATE.to_string(),
            object: proposal.statement.clone(),
            version: latest_version.map_or(1, |v| v + 1),
            source: decision_source(proposal.id.as_str()),
            tags: proposal.tags.clone(),
            created_at,
        }
    }

    pub fn key(&self) -> FactKey {
        FactKey::new(&self.group, &self.subject, &self.predicate)
    }
}

/// Source label recorded on facts derived from a decision
pub fn decision_source(proposal_id: &str) -> String {
    format!("decision:{}", proposal_id)
}

/// What happened to an attempted fact write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FactWriteOutcome {
    /// The incoming fact became the latest version
    Applied { version: u64 },
    /// Same version and source as the stored latest: a replay
    Unchanged { version: u64 },
    /// Two writers raced to the same version
    Conflict {
        version: u64,
        winner: String,
        loser: String,
        /// Whether the incoming write replaced the stored one
        incoming_won: bool,
    },
    /// The incoming version is older than the stored latest
    Stale { incoming: u64, latest: u64 },
}

impl FactWriteOutcome {
    /// Whether the incoming fact is now the one served by lookups
    pub fn incoming_is_latest(&self) -> bool {
        match self {
            FactWriteOutcome::Applied { .. } => true,
            FactWriteOutcome::Conflict { incoming_won, .. } => *incoming_won,
            FactWriteOutcome::Unchanged { .. } | FactWriteOutcome::Stale { .. } => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FactWriteOutcome::Applied { .. } => "applied",
            FactWriteOutcome::Unchanged { .. } => "unchanged",
            FactWriteOutcome::Conflict { .. } => "conflict",
            FactWriteOutcome::Stale { .. } => "stale",
        }
    }
}

/// Decide how an incoming fact interacts with the stored latest version.
pub fn resolve_fact_write(latest: Option<&Fact>, incoming: &Fact) -> FactWriteOutcome {
    let Some(latest) = latest else {
        return FactWriteOutcome::Applied {
            version: incoming.version,
        };
    };

    if incoming.version > latest.version {
        return FactWriteOutcome::Applied {
            version: incoming.version,
        };
    }
    if incoming.version < latest.version {
        return FactWriteOutcome::Stale {
            incoming: incoming.version,
            latest: latest.version,
        };
    }
    if incoming.source == latest.source {
        return FactWriteOutcome::Unchanged {
            version: incoming.version,
        };
    }

    let incoming_won = incoming.source < latest.source;
    let (winner, loser) = if incoming_won {
        (incoming.source.clone(), latest.source.clone())
    } else {
        (latest.source.clone(), incoming.source.clone())
    };
    FactWriteOutcome::Conflict {
        version: incoming.version,
        winner,
        loser,
        incoming_won,
    }
}
