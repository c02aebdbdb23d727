//! Cascade transitions: requested and applied

use super::status::CascadeStatus;
use super::task::CascadeTask;
use crate::core::identity::{AgentId, TraceId};
use crate::envelope::IdempotencyKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An applied status change, kept as the task's audit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeTransition {
    pub trace_id: TraceId,
    pub task_id: String,
    pub from: CascadeStatus,
    pub to: CascadeStatus,
    pub actor: AgentId,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub payload: Value,
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
}

impl CascadeTransition {
    /// Transition from the task's current status, keyed by its current attempt
    pub fn new(
        task: &CascadeTask,
        to: CascadeStatus,
        actor: AgentId,
        reason: impl Into<String>,
        payload: Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        TransitionRequest::new(task.trace_id.clone(), task.task_id.clone(), task.status, to, actor)
            .with_reason(reason)
            .with_payload(payload)
            .into_transition(task.retry_count, created_at)
    }
}

/// A caller's request to move a task from `from` to `to`
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub trace_id: TraceId,
    pub task_id: String,
    pub from: CascadeStatus,
    pub to: CascadeStatus,
    pub actor: AgentId,
    pub reason: String,
    pub payload: Value,
    /// Derived from the task and its attempt counter when absent
    pub idempotency_key: Option<IdempotencyKey>,
}

impl TransitionRequest {
    pub fn new(
        trace_id: impl Into<TraceId>,
        task_id: impl Into<String>,
        from: CascadeStatus,
        to: CascadeStatus,
        actor: impl Into<AgentId>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            task_id: task_id.into(),
            from,
            to,
            actor: actor.into(),
            reason: String::new(),
            payload: Value::Null,
            idempotency_key: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<IdempotencyKey>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// `self_test -> pending` raises the task's retry count when applied
    pub fn bumps_retry(&self) -> bool {
        self.from == CascadeStatus::SelfTest && self.to == CascadeStatus::Pending
    }

    pub fn key_for_attempt(&self, attempt: u32) -> IdempotencyKey {
        self.idempotency_key.clone().unwrap_or_else(|| {
            IdempotencyKey::cascade(
                self.trace_id.as_str(),
                &self.task_id,
                self.from.as_str(),
                self.to.as_str(),
                attempt,
            )
        })
    }

    pub fn into_transition(self, attempt: u32, created_at: DateTime<Utc>) -> CascadeTransition {
        let idempotency_key = self.key_for_attempt(attempt);
        CascadeTransition {
            trace_id: self.trace_id,
            task_id: self.task_id,
            from: self.from,
            to: self.to,
            actor: self.actor,
            reason: self.reason,
            payload: self.payload,
            idempotency_key,
            created_at,
        }
    }
}

/// Result of applying a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub transition: CascadeTransition,
    pub task: CascadeTask,
    /// The idempotency key had already been applied; nothing changed
    pub replayed: bool,
}
