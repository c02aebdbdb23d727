//! Identifiers shared across the governance and cascade domains.

use serde::{Deserialize, Serialize};

/// Identity of a peer agent.
///
/// Agents are addressed as `claw:instance`; the claw names the agent kind
/// and the instance disambiguates replicas of it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an AgentId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the `claw:instance` form.
    pub fn from_parts(claw: &str, instance: &str) -> Self {
        if instance.is_empty() {
            Self(claw.to_string())
        } else {
            Self(format!("{}:{}", claw, instance))
        }
    }

    /// The claw part (everything before the first `:`).
    pub fn claw(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation identifier carried by every envelope and cascade transition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random trace id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for TraceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TraceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_from_parts() {
        let id = AgentId::from_parts("scout", "7");
        assert_eq!(id.as_str(), "scout:7");
        assert_eq!(id.claw(), "scout");

        let bare = AgentId::from_parts("scout", "");
        assert_eq!(bare.as_str(), "scout");
    }

    #[test]
    fn test_agent_id_serializes_as_string() {
        let json = serde_json::to_string(&AgentId::new("a:1")).unwrap();
        assert_eq!(json, "\"a:1\"");
    }

    #[test]
    fn test_trace_id_generate_is_unique() {
        assert_ne!(TraceId::generate(), TraceId::generate());
        assert!(TraceId::new("  ").is_empty());
    }
}
