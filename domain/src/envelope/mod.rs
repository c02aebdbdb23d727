//! Versioned message envelopes exchanged between peers

pub mod codec;
pub mod idempotency;
pub mod payload;
pub mod topic;

pub use codec::{
    DecoderRegistry, Envelope, EnvelopeCodec, RawEnvelope, SCHEMA_VERSION,
    SUPPORTED_SCHEMA_VERSIONS, validate_base,
};
pub use idempotency::IdempotencyKey;
pub use payload::{
    CapabilitiesPayload, DecisionPayload, EnvelopeType, FactPayload, Payload, PresencePayload,
    ProposalPayload, VotePayload,
};
pub use topic::{TopicKind, parse_topic, topic};
