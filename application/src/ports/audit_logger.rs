//! Port for the structured audit trail.
//!
//! Defines the [`AuditLogger`] trait for recording governance and cascade
//! events (decisions, fact conflicts, stale fact writes, task transitions)
//! to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port keeps a
//! machine-readable record (JSONL) that can be replayed or audited later.

use serde_json::Value;

/// A structured audit event.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields. The adapter adds the timestamp.
pub struct AuditEvent {
    /// Event type identifier (e.g., "decision", "fact_conflict").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for writing audit events.
///
/// `record` is synchronous and non-fallible so that an audit sink problem
/// never aborts a state change that has already been committed.
pub trait AuditLogger: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn record(&self, _event: AuditEvent) {}
}
