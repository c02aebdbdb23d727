//! Application layer for agora
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod context;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::AgoraConfig;
pub use context::AppContext;
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    cascade_store::CascadeStore,
    clock::{Clock, FixedClock, SystemClock},
    knowledge_store::{KnowledgeStore, StoreError},
    transport::{NoTransport, Transport, TransportError},
};
pub use use_cases::cascade::{CascadeEngine, CascadeError, CreateTaskInput, SelfTestOutcome};
pub use use_cases::cast_vote::{CastVoteInput, CastVoteOutput, CastVoteUseCase};
pub use use_cases::evaluate::EvaluateUseCase;
pub use use_cases::governance::{FactWrite, GovernanceError, Resolution};
pub use use_cases::ingest::{IngestOutcome, IngestReport, IngestUseCase};
pub use use_cases::presence::{AnnounceInput, AnnounceOutput, AnnouncePresenceUseCase};
pub use use_cases::propose::{ProposeInput, ProposeOutput, ProposeUseCase};
pub use use_cases::queries::{GovernanceQueries, ProposalView, StatusCounts, StatusReport};
