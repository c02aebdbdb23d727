//! Stage checks: self-test validation and the sequence gate.

use super::status::CascadeStatus;
use super::task::{CascadeTask, FailureReason};
use serde_json::{Map, Value};

/// Validate a stage's self-test.
///
/// Checks run in a fixed order and the first failure wins:
/// 1. `missing_input`: a required input key is absent from both the supplied
///    input and the predecessor's produced output
/// 2. `missing_output`: nothing was produced, or a rule's key is absent
/// 3. `invalid_rules`: a rule has an empty key or its check fails
pub fn validate_stage(
    task: &CascadeTask,
    input: &Map<String, Value>,
    predecessor_output: Option<&Map<String, Value>>,
    produced: &Map<String, Value>,
) -> Result<(), FailureReason> {
    let has_input = |key: &String| {
        input.contains_key(key) || predecessor_output.is_some_and(|out| out.contains_key(key))
    };
    if !task.required_input.iter().all(has_input) {
        return Err(FailureReason::MissingInput);
    }

    if produced.is_empty() {
        return Err(FailureReason::MissingOutput);
    }
    let keyed_rule_missing = task
        .validation_rules
        .iter()
        .filter(|rule| !rule.key().trim().is_empty())
        .any(|rule| !produced.contains_key(rule.key()));
    if keyed_rule_missing {
        return Err(FailureReason::MissingOutput);
    }

    let rules_hold = task
        .validation_rules
        .iter()
        .all(|rule| !rule.key().trim().is_empty() && rule.is_satisfied(produced));
    if !rules_hold {
        return Err(FailureReason::InvalidRules);
    }

    Ok(())
}

/// The task immediately before `task` in its trace: the highest lower sequence
pub fn predecessor<'a>(task: &CascadeTask, tasks: &'a [CascadeTask]) -> Option<&'a CascadeTask> {
    tasks
        .iter()
        .filter(|t| t.trace_id == task.trace_id && t.sequence < task.sequence)
        .max_by_key(|t| t.sequence)
}

/// Whether `task` may start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageGate {
    Open,
    Blocked {
        predecessor: String,
        status: CascadeStatus,
    },
}

impl StageGate {
    pub fn is_open(&self) -> bool {
        matches!(self, StageGate::Open)
    }
}

/// A task may leave `pending` only once its predecessor is released
pub fn stage_gate(task: &CascadeTask, tasks: &[CascadeTask]) -> StageGate {
    match predecessor(task, tasks) {
        Some(prev) if prev.status != CascadeStatus::ReleasedNext => StageGate::Blocked {
            predecessor: prev.task_id.clone(),
            status: prev.status,
        },
        _ => StageGate::Open,
    }
}
