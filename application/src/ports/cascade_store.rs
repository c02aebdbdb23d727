//! Cascade store port

use super::knowledge_store::StoreError;
use agora_domain::{CascadeTask, CascadeTransition, TraceId, TransitionOutcome};
use async_trait::async_trait;

/// Storage for cascade tasks and their transition history
#[async_trait]
pub trait CascadeStore: Send + Sync {
    /// Insert a task; fails with `Duplicate` on a repeated task id or
    /// sequence within the same trace
    async fn create_cascade_task(&self, task: &CascadeTask) -> Result<(), StoreError>;

    async fn get_cascade_task(
        &self,
        trace_id: &TraceId,
        task_id: &str,
    ) -> Result<CascadeTask, StoreError>;

    /// Apply a transition with compare-and-set on the stored status.
    ///
    /// - A transition whose idempotency key was already applied to the task
    ///   returns the original transition with `replayed = true`.
    /// - Otherwise the stored status must equal `transition.from`, else
    ///   `StateConflict`.
    async fn advance_cascade_task(
        &self,
        transition: CascadeTransition,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Tasks of a trace ordered by sequence
    async fn list_cascade_tasks(
        &self,
        trace_id: &TraceId,
        include_archived: bool,
    ) -> Result<Vec<CascadeTask>, StoreError>;

    /// Transitions of a trace (optionally one task) in the order applied
    async fn list_cascade_transitions(
        &self,
        trace_id: &TraceId,
        task_id: Option<&str>,
    ) -> Result<Vec<CascadeTransition>, StoreError>;
}
