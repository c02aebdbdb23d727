//! Cascade task status and its transition table.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Stage of a cascade task
///
/// ```text
/// pending ─▶ running ─▶ self_test ─▶ validated ─▶ committed ─▶ released_next
///    │  ▲        │          │             │
///    │  └────────┼──────────┘ (retry)     │
///    ▼           ▼                        ▼
///  failed      failed                   failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    #[default]
    Pending,
    Running,
    SelfTest,
    Validated,
    Committed,
    ReleasedNext,
    Failed,
}

/// Every permitted `(from, to)` edge
const TRANSITIONS: &[(CascadeStatus, CascadeStatus)] = &[
    (CascadeStatus::Pending, CascadeStatus::Running),
    (CascadeStatus::Running, CascadeStatus::SelfTest),
    (CascadeStatus::SelfTest, CascadeStatus::Validated),
    (CascadeStatus::Validated, CascadeStatus::Committed),
    (CascadeStatus::Committed, CascadeStatus::ReleasedNext),
    (CascadeStatus::SelfTest, CascadeStatus::Pending),
    (CascadeStatus::Pending, CascadeStatus::Failed),
    (CascadeStatus::Running, CascadeStatus::Failed),
    (CascadeStatus::Validated, CascadeStatus::Failed),
];

impl CascadeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStatus::Pending => "pending",
            CascadeStatus::Running => "running",
            CascadeStatus::SelfTest => "self_test",
            CascadeStatus::Validated => "validated",
            CascadeStatus::Committed => "committed",
            CascadeStatus::ReleasedNext => "released_next",
            CascadeStatus::Failed => "failed",
        }
    }

    pub fn all() -> [CascadeStatus; 7] {
        [
            CascadeStatus::Pending,
            CascadeStatus::Running,
            CascadeStatus::SelfTest,
            CascadeStatus::Validated,
            CascadeStatus::Committed,
            CascadeStatus::ReleasedNext,
            CascadeStatus::Failed,
        ]
    }

    /// Terminal tasks are archived and accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, CascadeStatus::ReleasedNext | CascadeStatus::Failed)
    }

    pub fn can_transition_to(&self, to: CascadeStatus) -> bool {
        TRANSITIONS.contains(&(*self, to))
    }

    /// Statuses reachable from this one in a single step
    pub fn next_statuses(&self) -> Vec<CascadeStatus> {
        TRANSITIONS
            .iter()
            .filter(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .collect()
    }

    /// Whether `to` is one of the failure edges
    pub fn is_failure_edge(&self, to: CascadeStatus) -> bool {
        to == CascadeStatus::Failed
            || (*self == CascadeStatus::SelfTest && to == CascadeStatus::Pending)
    }
}

/// Reject an edge that is not in the transition table
pub fn check_transition(from: CascadeStatus, to: CascadeStatus) -> Result<(), DomainError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

impl std::fmt::Display for CascadeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CascadeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CascadeStatus::all()
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown cascade status: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_permitted() {
        let path = [
            CascadeStatus::Pending,
            CascadeStatus::Running,
            CascadeStatus::SelfTest,
            CascadeStatus::Validated,
            CascadeStatus::Committed,
            CascadeStatus::ReleasedNext,
        ];
        for pair in path.windows(2) {
            assert!(check_transition(pair[0], pair[1]).is_ok(), "{:?}", pair);
        }
    }

    #[test]
    fn test_skipping_stages_is_rejected() {
        let err = check_transition(CascadeStatus::Running, CascadeStatus::Committed).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "running".into(),
                to: "committed".into()
            }
        );
        assert!(check_transition(CascadeStatus::Pending, CascadeStatus::SelfTest).is_err());
    }

    #[test]
    fn test_committed_cannot_fail() {
        assert!(!CascadeStatus::Committed.can_transition_to(CascadeStatus::Failed));
        assert!(!CascadeStatus::SelfTest.can_transition_to(CascadeStatus::Failed));
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in CascadeStatus::all() {
            assert_eq!(status.is_terminal(), status.next_statuses().is_empty(), "{}", status);
        }
    }

    #[test]
    fn test_failure_edges() {
        assert!(CascadeStatus::SelfTest.is_failure_edge(CascadeStatus::Pending));
        assert!(CascadeStatus::Validated.is_failure_edge(CascadeStatus::Failed));
        assert!(!CascadeStatus::Pending.is_failure_edge(CascadeStatus::Running));
    }

    #[test]
    fn test_parse_and_serde_agree() {
        assert_eq!(
            "self-test".parse::<CascadeStatus>().unwrap(),
            CascadeStatus::SelfTest
        );
        assert_eq!(
            serde_json::to_string(&CascadeStatus::ReleasedNext).unwrap(),
            "\"released_next\""
        );
        assert!("done".parse::<CascadeStatus>().is_err());
    }
}
