//! Governance policy: the thresholds a proposal is judged against.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Voting policy for a group.
///
/// # Example
///
/// ```
/// use agora_domain::knowledge::GovernancePolicy;
/// use std::time::Duration;
///
/// let policy = GovernancePolicy::default()
///     .with_quorum(3, 2)
///     .with_timeout(Duration::from_secs(600));
/// assert_eq!(policy.quorum_yes, 3);
/// assert!(!policy.allow_self_vote);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePolicy {
    /// Master switch; when off every evaluation stays pending
    pub enabled: bool,
    /// Below this estimated pool size no decision is taken
    pub min_pool_size: usize,
    /// Yes votes needed for approval
    pub quorum_yes: usize,
    /// No votes needed for rejection
    pub quorum_no: usize,
    /// Age after which a proposal without quorum expires
    pub timeout: Duration,
    /// Whether the proposer's own ballot counts
    pub allow_self_vote: bool,
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_pool_size: 3,
            quorum_yes: 2,
            quorum_no: 2,
            timeout: Duration::from_secs(120),
            allow_self_vote: false,
        }
    }
}

impl GovernancePolicy {
    // ==================== Builder Methods ====================

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_pool_size(mut self, size: usize) -> Self {
        self.min_pool_size = size;
        self
    }

    pub fn with_quorum(mut self, yes: usize, no: usize) -> Self {
        self.quorum_yes = yes;
        self.quorum_no = no;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_allow_self_vote(mut self, allow: bool) -> Self {
        self.allow_self_vote = allow;
        self
    }

    /// Get a human-readable description of this policy
    pub fn description(&self) -> String {
        if !self.enabled {
            return "voting disabled".to_string();
        }
        format!(
            "approve at {} yes / reject at {} no, pool >= {}, timeout {}s{}",
            self.quorum_yes,
            self.quorum_no,
            self.min_pool_size,
            self.timeout.as_secs(),
            if self.allow_self_vote {
                ", self-vote counts"
            } else {
                ""
            }
        )
    }
}

impl std::fmt::Display for GovernancePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
