//! Governance configuration from TOML (`[governance]` section)

use agora_application::config::{DEFAULT_GROUP, DEFAULT_PRESENCE_WINDOW};
use agora_domain::GovernancePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw voting policy plus the roster settings that feed the pool estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGovernanceConfig {
    pub enabled: bool,
    pub min_pool_size: usize,
    pub quorum_yes: usize,
    pub quorum_no: usize,
    pub timeout_seconds: u64,
    pub allow_self_vote: bool,
    /// A member seen within this window counts toward the pool
    pub presence_window_seconds: u64,
    pub default_group: String,
}

impl Default for FileGovernanceConfig {
    fn default() -> Self {
        let policy = GovernancePolicy::default();
        Self {
            enabled: policy.enabled,
            min_pool_size: policy.min_pool_size,
            quorum_yes: policy.quorum_yes,
            quorum_no: policy.quorum_no,
            timeout_seconds: policy.timeout.as_secs(),
            allow_self_vote: policy.allow_self_vote,
            presence_window_seconds: DEFAULT_PRESENCE_WINDOW.as_secs(),
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

impl FileGovernanceConfig {
    pub fn to_policy(&self) -> GovernancePolicy {
        GovernancePolicy::default()
            .with_enabled(self.enabled)
            .with_min_pool_size(self.min_pool_size)
            .with_quorum(self.quorum_yes, self.quorum_no)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_allow_self_vote(self.allow_self_vote)
    }

    pub fn presence_window(&self) -> Duration {
        Duration::from_secs(self.presence_window_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_domain_policy() {
        assert_eq!(
            FileGovernanceConfig::default().to_policy(),
            GovernancePolicy::default()
        );
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: FileGovernanceConfig = toml::from_str("quorum_yes = 3").unwrap();
        let policy = config.to_policy();
        assert_eq!(policy.quorum_yes, 3);
        assert_eq!(policy.quorum_no, 2);
        assert_eq!(policy.timeout, Duration::from_secs(120));
        assert_eq!(config.default_group, "default");
    }
}
