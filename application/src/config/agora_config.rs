//! Node configuration container.
//!
//! [`AgoraConfig`] groups the settings use cases need: who this node is,
//! how its groups vote, and how cascades retry. Use cases read the slice
//! they need through the accessors.

use agora_domain::config::validate_governance;
use agora_domain::{AgentId, CascadePolicy, ConfigIssue, GovernancePolicy, Severity};
use std::time::Duration;

/// Default group when none is given on the command line
pub const DEFAULT_GROUP: &str = "default";

/// Default window in which a roster member counts as active
pub const DEFAULT_PRESENCE_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct AgoraConfig {
    identity: AgentId,
    policy: GovernancePolicy,
    presence_window: Duration,
    default_group: String,
    cascade: CascadePolicy,
}

impl Default for AgoraConfig {
    fn default() -> Self {
        Self {
            identity: AgentId::new(""),
            policy: GovernancePolicy::default(),
            presence_window: DEFAULT_PRESENCE_WINDOW,
            default_group: DEFAULT_GROUP.to_string(),
            cascade: CascadePolicy::default(),
        }
    }
}

impl AgoraConfig {
    pub fn new(identity: AgentId, policy: GovernancePolicy) -> Self {
        Self {
            identity,
            policy,
            ..Self::default()
        }
    }

    // ==================== Accessors ====================

    /// The local agent id used as proposer, voter and envelope origin
    pub fn identity(&self) -> &AgentId {
        &self.identity
    }

    pub fn policy(&self) -> &GovernancePolicy {
        &self.policy
    }

    pub fn presence_window(&self) -> Duration {
        self.presence_window
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    pub fn cascade(&self) -> &CascadePolicy {
        &self.cascade
    }

    /// `group` if given and non-empty, otherwise the default group
    pub fn group_or_default<'a>(&'a self, group: Option<&'a str>) -> &'a str {
        group
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(&self.default_group)
    }

    // ==================== Builder Methods ====================

    pub fn with_identity(mut self, identity: impl Into<AgentId>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_policy(mut self, policy: GovernancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_presence_window(mut self, window: Duration) -> Self {
        self.presence_window = window;
        self
    }

    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    pub fn with_cascade(mut self, cascade: CascadePolicy) -> Self {
        self.cascade = cascade;
        self
    }

    // ==================== Validation ====================

    pub fn validate(&self) -> Vec<ConfigIssue> {
        validate_governance(&self.policy, &self.identity)
    }

    /// Check whether any issues are errors (i.e. fatal).
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_or_default() {
        let config = AgoraConfig::default().with_default_group("ops");
        assert_eq!(config.group_or_default(None), "ops");
        assert_eq!(config.group_or_default(Some("  ")), "ops");
        assert_eq!(config.group_or_default(Some("research")), "research");
    }

    #[test]
    fn test_validate_flags_empty_identity() {
        let issues = AgoraConfig::default().validate();
        assert!(!issues.is_empty());
        assert!(!AgoraConfig::has_errors(&issues));
    }

    #[test]
    fn test_zero_quorum_is_fatal() {
        let config = AgoraConfig::new(
            AgentId::new("scout:1"),
            GovernancePolicy::default().with_quorum(2, 0),
        );
        assert!(AgoraConfig::has_errors(&config.validate()));
    }
}
