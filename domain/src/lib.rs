//! Domain layer for agora
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Knowledge governance
//!
//! Peers in a group propose statements and vote on them. Every peer runs the
//! same pure [`evaluate`] function over its replicated ballots, so any two
//! peers that have seen the same votes reach the same [`Decision`].
//! Approved proposals become versioned [`Fact`]s.
//!
//! ## Envelopes
//!
//! Everything exchanged between peers travels in a versioned [`Envelope`]
//! carrying a trace id and an [`IdempotencyKey`] so that at-least-once
//! delivery never applies a side effect twice.
//!
//! ## Cascades
//!
//! A trace of sequenced [`CascadeTask`]s, each walking a fixed state machine
//! and gated on its predecessor's release.

pub mod cascade;
pub mod config;
pub mod core;
pub mod envelope;
pub mod knowledge;

// Re-export commonly used types
pub use cascade::{
    CascadePolicy, CascadeStatus, CascadeTask, CascadeTransition, FailureReason, StageGate,
    TransitionOutcome, TransitionRequest, ValidationRule,
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{
    error::DomainError,
    identity::{AgentId, TraceId},
};
pub use envelope::{
    DecoderRegistry, Envelope, EnvelopeCodec, EnvelopeType, IdempotencyKey, Payload, TopicKind,
};
pub use knowledge::{
    Ballots, Decision, Fact, FactKey, FactWriteOutcome, GovernancePolicy, Proposal, ProposalId,
    ProposalStatus, RosterMember, Vote, VoteValue, evaluate,
};
