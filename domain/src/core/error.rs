//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// These are raised by pure domain checks (envelope validation, model
/// validation, transition table lookups) before anything touches storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(u32),

    #[error("Unknown envelope type: {0}")]
    UnknownEnvelopeType(String),

    #[error("Envelope type '{declared}' does not match payload type '{actual}'")]
    PayloadTypeMismatch { declared: String, actual: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl DomainError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Check if this error means the input was malformed
    ///
    /// Malformed input is rejected before persistence and must never be
    /// retried automatically.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_)
                | DomainError::UnsupportedSchemaVersion(_)
                | DomainError::UnknownEnvelopeType(_)
                | DomainError::PayloadTypeMismatch { .. }
                | DomainError::Decode(_)
        )
    }
}
