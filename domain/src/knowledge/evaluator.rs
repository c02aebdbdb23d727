//! Vote tally and quorum evaluation
//!
//! [`evaluate`] is a pure function: every peer that has seen the same ballots
//! computes the same [`Decision`]. Expiry is checked lazily against the
//! supplied `now`; there is no background timer.

use super::policy::GovernancePolicy;
use super::proposal::ProposalStatus;
use super::vote::{Ballots, VoteValue};
use crate::core::identity::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REASON_VOTING_DISABLED: &str = "voting disabled";
pub const REASON_POOL_BELOW_MINIMUM: &str = "pool below minimum";
pub const REASON_TIMEOUT: &str = "timeout before quorum";
pub const REASON_YES_QUORUM: &str = "yes quorum reached";
pub const REASON_NO_QUORUM: &str = "no quorum reached";

/// Outcome of evaluating a proposal's ballots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: ProposalStatus,
    pub yes: usize,
    pub no: usize,
    pub reason: String,
}

impl Decision {
    pub fn new(status: ProposalStatus, yes: usize, no: usize, reason: impl Into<String>) -> Self {
        Self {
            status,
            yes,
            no,
            reason: reason.into(),
        }
    }

    pub fn pending(yes: usize, no: usize, reason: impl Into<String>) -> Self {
        Self::new(ProposalStatus::Pending, yes, no, reason)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProposalStatus::Approved
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (yes={}, no={})", self.status, self.yes, self.no)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

/// Evaluate ballots against a governance policy.
///
/// The yes-quorum is checked before the no-quorum, so a tally that meets
/// both thresholds resolves to approved.
pub fn evaluate(
    proposer: &AgentId,
    pool_size: usize,
    ballots: &Ballots,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &GovernancePolicy,
) -> Decision {
    if !policy.enabled {
        return Decision::pending(0, 0, REASON_VOTING_DISABLED);
    }

    let effective = ballots
        .iter()
        .filter(|(voter, _)| policy.allow_self_vote || *voter != proposer)
        .map(|(_, value)| *value);

    let (yes, no) = effective.fold((0, 0), |(yes, no), value| match value {
        VoteValue::Yes => (yes + 1, no),
        VoteValue::No => (yes, no + 1),
    });

    if pool_size < policy.min_pool_size {
        return Decision::pending(yes, no, REASON_POOL_BELOW_MINIMUM);
    }
    if yes >= policy.quorum_yes {
        return Decision::new(ProposalStatus::Approved, yes, no, REASON_YES_QUORUM);
    }
    if no >= policy.quorum_no {
        return Decision::new(ProposalStatus::Rejected, yes, no, REASON_NO_QUORUM);
    }
    if has_timed_out(created_at, now, policy) {
        return Decision::new(ProposalStatus::Expired, yes, no, REASON_TIMEOUT);
    }
    Decision::pending(yes, no, "")
}

fn has_timed_out(created_at: DateTime<Utc>, now: DateTime<Utc>, policy: &GovernancePolicy) -> bool {
    // A negative elapsed time (peer clock behind) never expires.
    match (now - created_at).to_std() {
        Ok(elapsed) => elapsed >= policy.timeout,
        Err(_) => false,
    }
}
