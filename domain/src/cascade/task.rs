//! Cascade task entity, validation rules and retry policy

use super::status::{CascadeStatus, check_transition};
use super::transition::CascadeTransition;
use crate::core::error::DomainError;
use crate::core::identity::TraceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload field under which a transition carries the stage's produced output
pub const PRODUCED_OUTPUT_FIELD: &str = "producedOutput";

/// Retry budget applied to new tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePolicy {
    pub max_retries: u32,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl CascadePolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// A check over a task's produced output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ValidationRule {
    /// The key exists
    Present { key: String },
    /// The key exists and is not null, `""`, `[]` or `{}`
    NonEmpty { key: String },
    /// The key exists and equals `value`
    Equals { key: String, value: Value },
}

impl ValidationRule {
    pub fn present(key: impl Into<String>) -> Self {
        ValidationRule::Present { key: key.into() }
    }

    pub fn non_empty(key: impl Into<String>) -> Self {
        ValidationRule::NonEmpty { key: key.into() }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        ValidationRule::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ValidationRule::Present { key }
            | ValidationRule::NonEmpty { key }
            | ValidationRule::Equals { key, .. } => key,
        }
    }

    pub fn is_satisfied(&self, output: &Map<String, Value>) -> bool {
        match self {
            ValidationRule::Present { key } => output.contains_key(key),
            ValidationRule::NonEmpty { key } => output.get(key).is_some_and(|v| !is_empty_value(v)),
            ValidationRule::Equals { key, value } => output.get(key) == Some(value),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Why a stage failed its self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MissingInput,
    MissingOutput,
    InvalidRules,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MissingInput => "missing_input",
            FailureReason::MissingOutput => "missing_output",
            FailureReason::InvalidRules => "invalid_rules",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stage of a cascade, ordered within its trace by `sequence`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeTask {
    pub task_id: String,
    pub trace_id: TraceId,
    pub sequence: u32,
    pub title: String,
    pub status: CascadeStatus,
    /// Input keys the stage needs before it can pass self-test
    #[serde(default)]
    pub required_input: Vec<String>,
    #[serde(default)]
    pub produced_output: Map<String, Value>,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub last_reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CascadeTask {
    pub fn new(
        trace_id: impl Into<TraceId>,
        task_id: impl Into<String>,
        sequence: u32,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            trace_id: trace_id.into(),
            sequence,
            title: title.into(),
            status: CascadeStatus::Pending,
            required_input: Vec::new(),
            produced_output: Map::new(),
            validation_rules: Vec::new(),
            retry_count: 0,
            max_retries: CascadePolicy::default().max_retries,
            last_reason: String::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_required_input<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_input = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validation_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.validation_rules = rules;
        self
    }

    pub fn with_policy(mut self, policy: &CascadePolicy) -> Self {
        self.max_retries = policy.max_retries;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.trace_id.is_empty() {
            return Err(DomainError::validation("cascade task: trace id is required"));
        }
        if self.task_id.trim().is_empty() {
            return Err(DomainError::validation("cascade task: task id is required"));
        }
        Ok(())
    }

    pub fn is_archived(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether one more failed self-test would exceed the retry budget
    pub fn retries_exhausted_after_failure(&self) -> bool {
        self.retry_count + 1 > self.max_retries
    }

    /// Apply an already-authorized transition to this task.
    ///
    /// The caller is responsible for the compare-and-set on `from`; this only
    /// re-checks the edge and updates derived fields.
    pub fn apply_transition(&mut self, transition: &CascadeTransition) -> Result<(), DomainError> {
        check_transition(transition.from, transition.to)?;

        if transition.from == CascadeStatus::SelfTest && transition.to == CascadeStatus::Pending {
            self.retry_count += 1;
        }
        if let Some(Value::Object(output)) = transition.payload.get(PRODUCED_OUTPUT_FIELD) {
            self.produced_output = output.clone();
        }
        if transition.from.is_failure_edge(transition.to) || !transition.reason.is_empty() {
            self.last_reason = transition.reason.clone();
        }

        self.status = transition.to;
        self.updated_at = transition.created_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::AgentId;
    use serde_json::json;

    fn task() -> CascadeTask {
        CascadeTask::new("trace-1", "build", 1, "Build", Utc::now())
    }

    fn output(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_rule_checks() {
        let out = output(json!({"artifact": "bin", "empty": "", "count": 3}));
        assert!(ValidationRule::present("empty").is_satisfied(&out));
        assert!(!ValidationRule::non_empty("empty").is_satisfied(&out));
        assert!(ValidationRule::non_empty("artifact").is_satisfied(&out));
        assert!(ValidationRule::equals("count", 3).is_satisfied(&out));
        assert!(!ValidationRule::equals("count", 4).is_satisfied(&out));
        assert!(!ValidationRule::present("missing").is_satisfied(&out));
    }

    #[test]
    fn test_rule_serde_shape() {
        let rule: ValidationRule =
            serde_json::from_value(json!({"check": "equals", "key": "ok", "value": true})).unwrap();
        assert_eq!(rule, ValidationRule::equals("ok", true));
    }

    #[test]
    fn test_retry_budget() {
        let mut t = task().with_policy(&CascadePolicy::default().with_max_retries(1));
        assert!(!t.retries_exhausted_after_failure());
        t.retry_count = 1;
        assert!(t.retries_exhausted_after_failure());
    }

    #[test]
    fn test_apply_retry_transition() {
        let mut t = task();
        t.status = CascadeStatus::SelfTest;
        let transition = CascadeTransition::new(
            &t,
            CascadeStatus::Pending,
            AgentId::new("ci:1"),
            "missing_output",
            json!({PRODUCED_OUTPUT_FIELD: {}}),
            Utc::now(),
        );
        t.apply_transition(&transition).unwrap();
        assert_eq!(t.status, CascadeStatus::Pending);
        assert_eq!(t.retry_count, 1);
        assert_eq!(t.last_reason, "missing_output");
    }

    #[test]
    fn test_apply_records_output() {
        let mut t = task();
        t.status = CascadeStatus::SelfTest;
        let transition = CascadeTransition::new(
            &t,
            CascadeStatus::Validated,
            AgentId::new("ci:1"),
            "",
            json!({PRODUCED_OUTPUT_FIELD: {"artifact": "bin"}}),
            Utc::now(),
        );
        t.apply_transition(&transition).unwrap();
        assert_eq!(t.produced_output.get("artifact"), Some(&json!("bin")));
        assert_eq!(t.retry_count, 0);
    }

    #[test]
    fn test_apply_rejects_edge_outside_table() {
        let mut t = task();
        let transition = CascadeTransition::new(
            &t,
            CascadeStatus::Committed,
            AgentId::new("ci:1"),
            "",
            Value::Null,
            Utc::now(),
        );
        assert!(t.apply_transition(&transition).is_err());
        assert_eq!(t.status, CascadeStatus::Pending);
    }

    #[test]
    fn test_validate_requires_ids() {
        assert!(task().validate().is_ok());
        let t = CascadeTask::new("", "build", 1, "", Utc::now());
        assert!(t.validate().is_err());
    }
}
