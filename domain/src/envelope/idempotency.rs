//! Idempotency keys.
//!
//! A key names one logical action. It must be identical across every retry
//! of that action so consumers can recognise replays.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `knowledge:proposal:<id>`
    pub fn proposal(proposal_id: &str) -> Self {
        Self(format!("knowledge:proposal:{}", proposal_id))
    }

    /// `knowledge:vote:<proposalID>:<voterID>`
    pub fn vote(proposal_id: &str, voter_id: &str) -> Self {
        Self(format!("knowledge:vote:{}:{}", proposal_id, voter_id))
    }

    /// A changed ballot is a new logical action; revision 0 is the first vote.
    pub fn revote(proposal_id: &str, voter_id: &str, revision: u32) -> Self {
        if revision == 0 {
            return Self::vote(proposal_id, voter_id);
        }
        Self(format!(
            "knowledge:vote:{}:{}:r{}",
            proposal_id, voter_id, revision
        ))
    }

    /// `knowledge:decision:<id>`
    pub fn decision(proposal_id: &str) -> Self {
        Self(format!("knowledge:decision:{}", proposal_id))
    }

    /// `knowledge:fact:<group/subject/predicate>:v<version>:<source>`
    ///
    /// Two nodes deriving the same version from the same decision produce
    /// the same key.
    pub fn fact(fact_key: &str, version: u64, source: &str) -> Self {
        Self(format!("knowledge:fact:{}:v{}:{}", fact_key, version, source))
    }

    pub fn presence(group: &str, agent_id: &str, unix_secs: i64) -> Self {
        Self(format!(
            "knowledge:presence:{}:{}:{}",
            group, agent_id, unix_secs
        ))
    }

    pub fn capabilities(group: &str, agent_id: &str, unix_secs: i64) -> Self {
        Self(format!(
            "knowledge:capabilities:{}:{}:{}",
            group, agent_id, unix_secs
        ))
    }

    /// `cascade:<traceID>:<taskID>:<from>-><to>:<attempt>`
    pub fn cascade(trace_id: &str, task_id: &str, from: &str, to: &str, attempt: u32) -> Self {
        Self(format!(
            "cascade:{}:{}:{}->{}:{}",
            trace_id, task_id, from, to, attempt
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for IdempotencyKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builders() {
        assert_eq!(
            IdempotencyKey::vote("p-1", "scout:2").as_str(),
            "knowledge:vote:p-1:scout:2"
        );
        assert_eq!(
            IdempotencyKey::revote("p-1", "scout:2", 0),
            IdempotencyKey::vote("p-1", "scout:2")
        );
        assert_eq!(
            IdempotencyKey::revote("p-1", "scout:2", 3).as_str(),
            "knowledge:vote:p-1:scout:2:r3"
        );
        assert_eq!(
            IdempotencyKey::fact("ops/deploys/states", 2, "decision:p-a").as_str(),
            "knowledge:fact:ops/deploys/states:v2:decision:p-a"
        );
        assert_eq!(
            IdempotencyKey::cascade("t", "build", "running", "self_test", 0).as_str(),
            "cascade:t:build:running->self_test:0"
        );
    }

    #[test]
    fn test_key_is_stable_across_calls() {
        assert_eq!(
            IdempotencyKey::decision("p-7"),
            IdempotencyKey::decision("p-7")
        );
    }
}
