//! Cascading task engine.
//!
//! Drives [`CascadeTask`]s through their state machine:
//!
//! ```text
//! create ─▶ pending ──gate──▶ running ─▶ self_test ──validate──▶ validated ─▶ committed ─▶ released_next
//!              ▲                              │
//!              └──── retry (budget left) ─────┘──▶ pending ─▶ failed (budget exhausted)
//! ```
//!
//! Every status change goes through the store's compare-and-set, so two
//! actors racing on the same task cannot both win.

use crate::context::AppContext;
use crate::ports::knowledge_store::StoreError;
use agora_domain::cascade::{check_transition, predecessor, stage_gate, validate_stage};
use agora_domain::{
    AgentId, CascadeStatus, CascadeTask, CascadeTransition, DomainError, FailureReason,
    IdempotencyKey, StageGate, TraceId, TransitionOutcome, TransitionRequest, ValidationRule,
};
use agora_domain::cascade::PRODUCED_OUTPUT_FIELD;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by the cascade engine
#[derive(Error, Debug)]
pub enum CascadeError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Task {task} cannot start: predecessor {predecessor} is {status}")]
    StageGateBlocked {
        task: String,
        predecessor: String,
        status: CascadeStatus,
    },
}

impl CascadeError {
    /// The stored status did not match the caller's `from`
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, CascadeError::Store(StoreError::StateConflict { .. }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    /// A fresh trace is generated when absent
    pub trace_id: Option<TraceId>,
    pub task_id: String,
    pub sequence: u32,
    pub title: String,
    pub required_input: Vec<String>,
    pub validation_rules: Vec<ValidationRule>,
}

/// Result of a self-test report
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestOutcome {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// The retry budget ran out and the task was failed
    pub exhausted: bool,
    pub transitions: Vec<TransitionOutcome>,
    pub task: CascadeTask,
}

pub struct CascadeEngine {
    ctx: AppContext,
}

impl CascadeEngine {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn create_task(&self, input: CreateTaskInput) -> Result<CascadeTask, CascadeError> {
        let trace_id = input.trace_id.unwrap_or_else(TraceId::generate);
        let task = CascadeTask::new(
            trace_id,
            input.task_id,
            input.sequence,
            input.title,
            self.ctx.clock.now(),
        )
        .with_required_input(input.required_input)
        .with_validation_rules(input.validation_rules)
        .with_policy(self.ctx.config.cascade());
        task.validate()?;

        let _guard = self.ctx.write_guard().await;
        self.ctx.cascade.create_cascade_task(&task).await?;
        info!(
            "Cascade task {}#{} ({}) created in trace {}",
            task.task_id, task.sequence, task.title, task.trace_id
        );
        Ok(task)
    }

    /// Move a task from `request.from` to `request.to`
    pub async fn advance(&self, request: TransitionRequest) -> Result<TransitionOutcome, CascadeError> {
        let _guard = self.ctx.write_guard().await;
        self.advance_locked(request).await
    }

    /// Report the result of a stage's self-test.
    ///
    /// A task still `running` is first moved to `self_test`. Validation then
    /// either passes (`validated`) or loops back to `pending`, failing the
    /// task once the retry budget is spent.
    pub async fn report_self_test(
        &self,
        trace_id: &TraceId,
        task_id: &str,
        actor: AgentId,
        input: Map<String, Value>,
        produced: Map<String, Value>,
    ) -> Result<SelfTestOutcome, CascadeError> {
        let _guard = self.ctx.write_guard().await;
        let mut transitions = Vec::new();

        let mut task = self.ctx.cascade.get_cascade_task(trace_id, task_id).await?;
        if task.status == CascadeStatus::Running {
            let request = TransitionRequest::new(
                trace_id.clone(),
                task_id,
                CascadeStatus::Running,
                CascadeStatus::SelfTest,
                actor.clone(),
            );
            let outcome = self.advance_locked(request).await?;
            task = outcome.task.clone();
            transitions.push(outcome);
        }
        if task.status != CascadeStatus::SelfTest {
            return Err(StoreError::StateConflict {
                id: task_id.to_string(),
                expected: CascadeStatus::SelfTest.to_string(),
                actual: task.status.to_string(),
            }
            .into());
        }

        let siblings = self
            .ctx
            .cascade
            .list_cascade_tasks(trace_id, true)
            .await?;
        let predecessor_output = predecessor(&task, &siblings).map(|p| &p.produced_output);
        let verdict = validate_stage(&task, &input, predecessor_output, &produced);
        let payload = json!({"input": input, PRODUCED_OUTPUT_FIELD: produced});

        let reason = match verdict {
            Ok(()) => {
                let request = TransitionRequest::new(
                    trace_id.clone(),
                    task_id,
                    CascadeStatus::SelfTest,
                    CascadeStatus::Validated,
                    actor,
                )
                .with_payload(payload);
                let outcome = self.advance_locked(request).await?;
                let task = outcome.task.clone();
                transitions.push(outcome);
                return Ok(SelfTestOutcome {
                    passed: true,
                    reason: None,
                    exhausted: false,
                    transitions,
                    task,
                });
            }
            Err(reason) => reason,
        };

        let exhausted = task.retries_exhausted_after_failure();
        let retry = TransitionRequest::new(
            trace_id.clone(),
            task_id,
            CascadeStatus::SelfTest,
            CascadeStatus::Pending,
            actor.clone(),
        )
        .with_reason(reason.as_str())
        .with_payload(payload);
        let outcome = self.advance_locked(retry).await?;
        let mut task = outcome.task.clone();
        transitions.push(outcome);

        if exhausted {
            warn!(
                "Cascade task {} exhausted {} retries: {}",
                task_id, task.max_retries, reason
            );
            let fail = TransitionRequest::new(
                trace_id.clone(),
                task_id,
                CascadeStatus::Pending,
                CascadeStatus::Failed,
                actor,
            )
            .with_reason(reason.as_str());
            let outcome = self.advance_locked(fail).await?;
            task = outcome.task.clone();
            transitions.push(outcome);
        }

        Ok(SelfTestOutcome {
            passed: false,
            reason: Some(reason),
            exhausted,
            transitions,
            task,
        })
    }

    /// Record a runtime or commit error: the task's current status to `failed`
    pub async fn fail_task(
        &self,
        trace_id: &TraceId,
        task_id: &str,
        actor: AgentId,
        reason: impl Into<String>,
    ) -> Result<TransitionOutcome, CascadeError> {
        let _guard = self.ctx.write_guard().await;
        let task = self.ctx.cascade.get_cascade_task(trace_id, task_id).await?;
        let request = TransitionRequest::new(
            trace_id.clone(),
            task_id,
            task.status,
            CascadeStatus::Failed,
            actor,
        )
        .with_reason(reason);
        self.advance_locked(request).await
    }

    pub async fn tasks(
        &self,
        trace_id: &TraceId,
        include_archived: bool,
    ) -> Result<Vec<CascadeTask>, CascadeError> {
        Ok(self
            .ctx
            .cascade
            .list_cascade_tasks(trace_id, include_archived)
            .await?)
    }

    pub async fn transitions(
        &self,
        trace_id: &TraceId,
        task_id: Option<&str>,
    ) -> Result<Vec<CascadeTransition>, CascadeError> {
        Ok(self
            .ctx
            .cascade
            .list_cascade_transitions(trace_id, task_id)
            .await?)
    }

    /// Attempt number that keys `request` when the caller gave no key.
    ///
    /// Applying `self_test -> pending` raises the retry count. Once the task
    /// has moved on, a repeat of that request is keyed by the attempt it was
    /// first applied under so the store can acknowledge it as a replay.
    async fn attempt_for(
        &self,
        request: &TransitionRequest,
        task: &CascadeTask,
    ) -> Result<u32, CascadeError> {
        if request.idempotency_key.is_some()
            || !request.bumps_retry()
            || task.status == request.from
            || task.retry_count == 0
        {
            return Ok(task.retry_count);
        }
        let previous = task.retry_count - 1;
        if self
            .was_applied(request, &request.key_for_attempt(previous))
            .await?
        {
            Ok(previous)
        } else {
            Ok(task.retry_count)
        }
    }

    async fn was_applied(
        &self,
        request: &TransitionRequest,
        key: &IdempotencyKey,
    ) -> Result<bool, CascadeError> {
        Ok(self
            .ctx
            .cascade
            .list_cascade_transitions(&request.trace_id, Some(&request.task_id))
            .await?
            .iter()
            .any(|t| &t.idempotency_key == key))
    }

    async fn advance_locked(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, CascadeError> {
        check_transition(request.from, request.to)?;

        let task = self
            .ctx
            .cascade
            .get_cascade_task(&request.trace_id, &request.task_id)
            .await?;

        if request.from == CascadeStatus::Pending && request.to == CascadeStatus::Running {
            let siblings = self
                .ctx
                .cascade
                .list_cascade_tasks(&request.trace_id, true)
                .await?;
            if let StageGate::Blocked {
                predecessor,
                status,
            } = stage_gate(&task, &siblings)
            {
                // a replayed start was admitted earlier and must still be acknowledged
                let key = request.key_for_attempt(task.retry_count);
                if !self.was_applied(&request, &key).await? {
                    return Err(CascadeError::StageGateBlocked {
                        task: task.task_id,
                        predecessor,
                        status,
                    });
                }
            }
        }

        let attempt = self.attempt_for(&request, &task).await?;
        let transition = request.into_transition(attempt, self.ctx.clock.now());
        let outcome = self.ctx.cascade.advance_cascade_task(transition).await?;

        let t = &outcome.transition;
        if outcome.replayed {
            debug!("Replay of {} on task {} ignored", t.idempotency_key, t.task_id);
        } else {
            info!(
                "Cascade task {} {} -> {} by {}",
                t.task_id, t.from, t.to, t.actor
            );
            self.ctx.audit(
                "cascade_transition",
                json!({
                    "trace_id": t.trace_id,
                    "task_id": t.task_id,
                    "from": t.from,
                    "to": t.to,
                    "actor": t.actor,
                    "reason": t.reason,
                    "idempotency_key": t.idempotency_key,
                    "retry_count": outcome.task.retry_count,
                }),
            );
        }
        Ok(outcome)
    }
}
