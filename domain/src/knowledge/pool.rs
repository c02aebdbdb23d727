//! Voter pool estimation from the group roster.
//!
//! Roster membership is only eventually consistent, so the pool size is an
//! estimate. Overestimating makes decisions harder to reach, underestimating
//! makes them easier.

use super::policy::GovernancePolicy;
use crate::core::identity::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A peer known to be part of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMember {
    pub group: String,
    pub agent: AgentId,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl RosterMember {
    pub fn new(group: impl Into<String>, agent: impl Into<AgentId>, last_seen: DateTime<Utc>) -> Self {
        Self {
            group: group.into(),
            agent: agent.into(),
            last_seen,
            capabilities: Vec::new(),
        }
    }

    /// Seen within `window` of `now`
    pub fn is_active(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.last_seen).to_std() {
            Ok(elapsed) => elapsed <= window,
            // last_seen in the future: treat as freshly seen
            Err(_) => true,
        }
    }
}

/// Count roster members active at `now`
pub fn count_active(members: &[RosterMember], now: DateTime<Utc>, window: Duration) -> usize {
    members.iter().filter(|m| m.is_active(now, window)).count()
}

/// Estimate the number of eligible voters.
///
/// Resolution order: explicit override (> 0), active roster count (> 0),
/// the policy minimum (> 0), and finally 1.
pub fn estimate_pool_size(
    override_size: Option<usize>,
    active_members: usize,
    policy: &GovernancePolicy,
) -> usize {
    if let Some(size) = override_size
        && size > 0
    {
        return size;
    }
    if active_members > 0 {
        return active_members;
    }
    if policy.min_pool_size > 0 {
        return policy.min_pool_size;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_override_wins() {
        let policy = GovernancePolicy::default();
        assert_eq!(estimate_pool_size(Some(9), 4, &policy), 9);
    }

    #[test]
    fn test_zero_override_falls_through_to_roster() {
        let policy = GovernancePolicy::default();
        assert_eq!(estimate_pool_size(Some(0), 4, &policy), 4);
        assert_eq!(estimate_pool_size(None, 4, &policy), 4);
    }

    #[test]
    fn test_empty_roster_falls_back_to_policy_minimum() {
        let policy = GovernancePolicy::default().with_min_pool_size(5);
        assert_eq!(estimate_pool_size(None, 0, &policy), 5);
    }

    #[test]
    fn test_last_resort_is_one() {
        let policy = GovernancePolicy::default().with_min_pool_size(0);
        assert_eq!(estimate_pool_size(None, 0, &policy), 1);
    }

    #[test]
    fn test_count_active_respects_window() {
        let now = Utc::now();
        let window = Duration::from_secs(300);
        let members = vec![
            RosterMember::new("ops", "a", now - ChronoDuration::seconds(10)),
            RosterMember::new("ops", "b", now - ChronoDuration::seconds(300)),
            RosterMember::new("ops", "c", now - ChronoDuration::seconds(301)),
            RosterMember::new("ops", "d", now + ChronoDuration::seconds(5)),
        ];
        assert_eq!(count_active(&members, now, window), 3);
    }
}
