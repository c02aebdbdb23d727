//! Vote types for proposal governance
//!
//! This module defines the voting primitives peers exchange about a proposal.

use super::proposal::ProposalId;
use crate::core::identity::{AgentId, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Yes,
    No,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Yes => "yes",
            VoteValue::No => "no",
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, VoteValue::Yes)
    }
}

impl std::fmt::Display for VoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VoteValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(VoteValue::Yes),
            "no" | "n" => Ok(VoteValue::No),
            other => Err(format!("Unknown vote value: {}. Valid: yes, no", other)),
        }
    }
}

/// A single vote from a peer on a proposal
///
/// Votes are unique per `(proposal_id, voter)`. Each change of mind bumps
/// `revision`, and a stored ballot is only replaced by one with the same or
/// a higher revision.
///
/// # Example
///
/// ```
/// use agora_domain::knowledge::{Vote, VoteValue};
///
/// let vote = Vote::yes("p-1", "scout:1", "Matches what I observed");
/// assert_eq!(vote.value, VoteValue::Yes);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub voter: AgentId,
    pub value: VoteValue,
    pub reason: String,
    pub trace_id: TraceId,
    #[serde(default)]
    pub revision: u32,
}

impl Vote {
    pub fn new(
        proposal_id: impl Into<ProposalId>,
        voter: impl Into<AgentId>,
        value: VoteValue,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            voter: voter.into(),
            value,
            reason: reason.into(),
            trace_id: TraceId::generate(),
            revision: 0,
        }
    }

    pub fn yes(
        proposal_id: impl Into<ProposalId>,
        voter: impl Into<AgentId>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(proposal_id, voter, VoteValue::Yes, reason)
    }

    pub fn no(
        proposal_id: impl Into<ProposalId>,
        voter: impl Into<AgentId>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(proposal_id, voter, VoteValue::No, reason)
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    /// Whether this ballot may replace `stored`
    pub fn supersedes(&self, stored: &Vote) -> bool {
        self.revision >= stored.revision
    }
}

/// The ballot box for one proposal: voter -> last value cast.
///
/// A `BTreeMap` keeps iteration order stable so that every peer renders and
/// evaluates the same set identically.
pub type Ballots = BTreeMap<AgentId, VoteValue>;

/// Collapse a list of votes into ballots, last value per voter wins.
pub fn ballots_from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Ballots {
    votes
        .into_iter()
        .map(|v| (v.voter.clone(), v.value))
        .collect()
}

/// Generate a visual ballot summary (e.g., "[●●○]")
pub fn ballot_summary(ballots: &Ballots) -> String {
    let mut summary = String::from("[");
    for value in ballots.values() {
        summary.push(if value.is_yes() { '●' } else { '○' });
    }
    summary.push(']');
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_creation() {
        let vote = Vote::yes("p-1", "scout:1", "Looks right");
        assert_eq!(vote.value, VoteValue::Yes);
        assert_eq!(vote.voter.as_str(), "scout:1");
        assert_eq!(vote.reason, "Looks right");
        assert!(!vote.trace_id.is_empty());
    }

    #[test]
    fn test_vote_value_parse() {
        assert_eq!("YES".parse::<VoteValue>().ok(), Some(VoteValue::Yes));
        assert_eq!("n".parse::<VoteValue>().ok(), Some(VoteValue::No));
        assert!("maybe".parse::<VoteValue>().is_err());
    }

    #[test]
    fn test_vote_value_serde_lowercase() {
        assert_eq!(serde_json::to_string(&VoteValue::No).unwrap(), "\"no\"");
    }

    #[test]
    fn test_ballots_last_value_wins() {
        let votes = vec![
            Vote::yes("p", "a", ""),
            Vote::no("p", "b", ""),
            Vote::no("p", "a", "changed my mind"),
        ];
        let ballots = ballots_from_votes(&votes);

        assert_eq!(ballots.len(), 2);
        assert_eq!(ballots[&AgentId::new("a")], VoteValue::No);
    }

    #[test]
    fn test_older_revision_does_not_supersede() {
        let changed = Vote::no("p", "a", "").with_revision(1);
        let first = Vote::yes("p", "a", "");
        assert!(changed.supersedes(&first));
        assert!(!first.supersedes(&changed));
        assert!(changed.supersedes(&changed));
    }

    #[test]
    fn test_ballot_summary() {
        let votes = vec![
            Vote::yes("p", "a", ""),
            Vote::yes("p", "b", ""),
            Vote::no("p", "c", ""),
        ];
        assert_eq!(ballot_summary(&ballots_from_votes(&votes)), "[●●○]");
    }
}
