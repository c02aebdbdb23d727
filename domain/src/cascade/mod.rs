//! Cascading task engine domain
//!
//! A trace is an ordered chain of tasks. Each task walks a fixed state
//! machine, and a task may only start once the task before it in the trace
//! has been released.

pub mod stage;
pub mod status;
pub mod task;
pub mod transition;

pub use stage::{StageGate, predecessor, stage_gate, validate_stage};
pub use status::{CascadeStatus, check_transition};
pub use task::{CascadePolicy, CascadeTask, FailureReason, PRODUCED_OUTPUT_FIELD, ValidationRule};
pub use transition::{CascadeTransition, TransitionOutcome, TransitionRequest};
