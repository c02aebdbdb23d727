//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod cascade;
mod governance;
mod identity;
mod logging;
mod storage;

pub use cascade::FileCascadeConfig;
pub use governance::FileGovernanceConfig;
pub use identity::FileIdentityConfig;
pub use logging::FileLoggingConfig;
pub use storage::FileStorageConfig;

use agora_application::AgoraConfig;
use agora_domain::{AgentId, ConfigIssue, OutputFormat};
use agora_domain::config::validate_governance;
use serde::{Deserialize, Serialize};

/// Identity used when `[identity]` is left empty
pub const ANONYMOUS_AGENT: &str = "anonymous";

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub identity: FileIdentityConfig,
    pub governance: FileGovernanceConfig,
    pub cascade: FileCascadeConfig,
    pub storage: FileStorageConfig,
    pub output: FileOutputConfig,
    pub logging: FileLoggingConfig,
}

/// `[output]`: rendering of command results.
///
/// An unset `format` leaves the choice to `--output`, then text. `color`
/// only applies to text; JSON is always plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        validate_governance(&self.governance.to_policy(), &self.identity.agent_id())
    }

    /// Build the application config, optionally speaking as another agent
    pub fn to_agora_config(&self, identity_override: Option<&str>) -> AgoraConfig {
        let identity = identity_override
            .filter(|id| !id.trim().is_empty())
            .map(AgentId::from)
            .unwrap_or_else(|| self.identity.agent_id());
        let identity = if identity.is_empty() {
            AgentId::new(ANONYMOUS_AGENT)
        } else {
            identity
        };

        AgoraConfig::new(identity, self.governance.to_policy())
            .with_presence_window(self.governance.presence_window())
            .with_default_group(self.governance.default_group.clone())
            .with_cascade(self.cascade.to_policy())
    }
}
