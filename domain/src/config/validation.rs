//! Governance configuration validation.
//!
//! Some threshold combinations can never reach a decision, others work
//! but probably not the way the operator intended. This module detects
//! both and returns structured issues with severity levels.
//!
//! # Examples
//!
//! ```
//! use agora_domain::AgentId;
//! use agora_domain::config::validate_governance;
//! use agora_domain::knowledge::GovernancePolicy;
//!
//! let issues = validate_governance(&GovernancePolicy::default(), &AgentId::new("scout:1"));
//! assert!(issues.is_empty());
//! ```

use crate::core::identity::AgentId;
use crate::knowledge::GovernancePolicy;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A quorum threshold of zero approves or rejects with no votes at all.
    ZeroQuorum,
    /// A quorum larger than the minimum pool may be unreachable in small groups.
    QuorumAboveMinPool,
    /// A zero timeout expires proposals on their first evaluation.
    ZeroTimeout,
    /// No claw/instance configured; votes and proposals would be anonymous.
    EmptyIdentity,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Check a governance policy together with the local identity
pub fn validate_governance(policy: &GovernancePolicy, identity: &AgentId) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if policy.quorum_yes == 0 || policy.quorum_no == 0 {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::ZeroQuorum,
            format!(
                "quorum thresholds must be at least 1 (yes={}, no={})",
                policy.quorum_yes, policy.quorum_no
            ),
        ));
    }

    let largest = policy.quorum_yes.max(policy.quorum_no);
    if largest > policy.min_pool_size {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::QuorumAboveMinPool,
            format!(
                "quorum of {} exceeds min_pool_size {}; small groups may only ever expire",
                largest, policy.min_pool_size
            ),
        ));
    }

    if policy.timeout.is_zero() {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::ZeroTimeout,
            "timeout_seconds is 0; undecided proposals expire immediately",
        ));
    }

    if identity.is_empty() {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::EmptyIdentity,
            "identity.claw is not set; falling back to an anonymous agent id",
        ));
    }

    issues
}
