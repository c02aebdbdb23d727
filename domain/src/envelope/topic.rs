//! Pub/sub topic naming: `{group}.knowledge.{kind}`

use serde::{Deserialize, Serialize};

/// The per-group knowledge topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Proposals,
    Votes,
    Decisions,
    Facts,
    Presence,
    Capabilities,
}

impl TopicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::Proposals => "proposals",
            TopicKind::Votes => "votes",
            TopicKind::Decisions => "decisions",
            TopicKind::Facts => "facts",
            TopicKind::Presence => "presence",
            TopicKind::Capabilities => "capabilities",
        }
    }

    pub fn all() -> [TopicKind; 6] {
        [
            TopicKind::Proposals,
            TopicKind::Votes,
            TopicKind::Decisions,
            TopicKind::Facts,
            TopicKind::Presence,
            TopicKind::Capabilities,
        ]
    }
}

impl std::fmt::Display for TopicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full topic name for a group
pub fn topic(group: &str, kind: TopicKind) -> String {
    format!("{}.knowledge.{}", group, kind.as_str())
}

/// Split a topic name back into `(group, kind)`.
///
/// Groups may themselves contain dots, so the suffix is matched from the right.
pub fn parse_topic(name: &str) -> Option<(&str, TopicKind)> {
    TopicKind::all().into_iter().find_map(|kind| {
        let suffix = format!(".knowledge.{}", kind.as_str());
        name.strip_suffix(suffix.as_str())
            .filter(|group| !group.is_empty())
            .map(|group| (group, kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(topic("ops", TopicKind::Votes), "ops.knowledge.votes");
        assert_eq!(
            topic("ops", TopicKind::Capabilities),
            "ops.knowledge.capabilities"
        );
    }

    #[test]
    fn test_parse_topic_with_dotted_group() {
        assert_eq!(
            parse_topic("eu.ops.knowledge.decisions"),
            Some(("eu.ops", TopicKind::Decisions))
        );
        assert_eq!(parse_topic(".knowledge.votes"), None);
        assert_eq!(parse_topic("ops.telemetry"), None);
    }
}
