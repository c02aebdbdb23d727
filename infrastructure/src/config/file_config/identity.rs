//! Identity configuration from TOML (`[identity]` section)

use agora_domain::AgentId;
use serde::{Deserialize, Serialize};

/// Who this node speaks as: `claw:instance`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIdentityConfig {
    pub claw: String,
    pub instance: String,
}

impl FileIdentityConfig {
    pub fn agent_id(&self) -> AgentId {
        AgentId::from_parts(self.claw.trim(), self.instance.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_joins_parts() {
        let config = FileIdentityConfig {
            claw: "scout".into(),
            instance: "7".into(),
        };
        assert_eq!(config.agent_id().as_str(), "scout:7");
    }

    #[test]
    fn test_instance_is_optional() {
        let config = FileIdentityConfig {
            claw: "lead".into(),
            instance: String::new(),
        };
        assert_eq!(config.agent_id().as_str(), "lead");
    }
}
