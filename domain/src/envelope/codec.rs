//! Envelope wire format, base validation and the type-indexed decoder registry.
//!
//! Decoding is two-phase:
//!
//! ```text
//! bytes ──serde──▶ RawEnvelope ──validate_base──▶ registry[type](payload) ──▶ Envelope
//! ```
//!
//! The raw form keeps every field optional so that a malformed envelope is
//! reported as a validation failure naming the field, not as an opaque
//! serde error.

use super::idempotency::IdempotencyKey;
use super::payload::{
    CapabilitiesPayload, DecisionPayload, EnvelopeType, FactPayload, Payload, PresencePayload,
    ProposalPayload, VotePayload,
};
use crate::core::error::DomainError;
use crate::core::identity::{AgentId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current schema version written by this crate
pub const SCHEMA_VERSION: u32 = 1;

/// Schema versions this crate can read
pub const SUPPORTED_SCHEMA_VERSIONS: &[u32] = &[1];

/// Envelope exactly as it appears on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub idempotency_key: String,
    #[serde(default)]
    pub origin_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Check the fields every envelope must carry, regardless of type.
pub fn validate_base(raw: &RawEnvelope) -> Result<(), DomainError> {
    if !SUPPORTED_SCHEMA_VERSIONS.contains(&raw.schema_version) {
        return Err(DomainError::UnsupportedSchemaVersion(raw.schema_version));
    }
    match raw.kind.as_deref() {
        Some(kind) if !kind.trim().is_empty() => {}
        _ => return Err(DomainError::validation("envelope type is required")),
    }
    if raw.trace_id.trim().is_empty() {
        return Err(DomainError::validation("envelope traceId is required"));
    }
    if raw.idempotency_key.trim().is_empty() {
        return Err(DomainError::validation(
            "envelope idempotencyKey is required",
        ));
    }
    match raw.timestamp {
        Some(ts) if ts.timestamp() > 0 => Ok(()),
        _ => Err(DomainError::validation("envelope timestamp is required")),
    }
}

/// A validated envelope with a typed payload
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub schema_version: u32,
    pub trace_id: TraceId,
    pub timestamp: DateTime<Utc>,
    pub idempotency_key: IdempotencyKey,
    pub origin_id: AgentId,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(
        payload: Payload,
        origin_id: AgentId,
        idempotency_key: IdempotencyKey,
        trace_id: TraceId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            trace_id,
            timestamp,
            idempotency_key,
            origin_id,
            payload,
        }
    }

    /// The envelope type, always derived from the payload variant
    pub fn kind(&self) -> EnvelopeType {
        self.payload.envelope_type()
    }

    pub fn to_raw(&self) -> Result<RawEnvelope, DomainError> {
        Ok(RawEnvelope {
            schema_version: self.schema_version,
            kind: Some(self.kind().as_str().to_string()),
            trace_id: self.trace_id.as_str().to_string(),
            timestamp: Some(self.timestamp),
            idempotency_key: self.idempotency_key.as_str().to_string(),
            origin_id: self.origin_id.as_str().to_string(),
            payload: self.payload.to_value()?,
        })
    }
}

type PayloadDecoder = fn(serde_json::Value) -> Result<Payload, DomainError>;

/// Maps an envelope type to the decoder for its payload.
///
/// A type without a registered decoder is rejected; nothing is decoded on a
/// best-effort basis.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<EnvelopeType, PayloadDecoder>,
}

impl DecoderRegistry {
    /// A registry that decodes nothing
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with decoders for every built-in type
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(EnvelopeType::Proposal, decode_proposal)
            .with(EnvelopeType::Vote, decode_vote)
            .with(EnvelopeType::Decision, decode_decision)
            .with(EnvelopeType::Fact, decode_fact)
            .with(EnvelopeType::Presence, decode_presence)
            .with(EnvelopeType::Capabilities, decode_capabilities)
    }

    pub fn with(mut self, kind: EnvelopeType, decoder: PayloadDecoder) -> Self {
        self.register(kind, decoder);
        self
    }

    pub fn register(&mut self, kind: EnvelopeType, decoder: PayloadDecoder) {
        self.decoders.insert(kind, decoder);
    }

    pub fn supports(&self, kind: EnvelopeType) -> bool {
        self.decoders.contains_key(&kind)
    }

    /// Decode the payload of an envelope declared as `kind`
    pub fn decode(&self, kind: &str, payload: serde_json::Value) -> Result<Payload, DomainError> {
        let kind: EnvelopeType = kind.parse()?;
        let decoder = self
            .decoders
            .get(&kind)
            .ok_or_else(|| DomainError::UnknownEnvelopeType(kind.as_str().to_string()))?;
        let payload = decoder(payload)?;
        if payload.envelope_type() != kind {
            return Err(DomainError::PayloadTypeMismatch {
                declared: kind.as_str().to_string(),
                actual: payload.envelope_type().as_str().to_string(),
            });
        }
        payload.validate()?;
        Ok(payload)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.decoders.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("types", &kinds)
            .finish()
    }
}

fn decode_error(e: serde_json::Error) -> DomainError {
    DomainError::Decode(e.to_string())
}

fn decode_proposal(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<ProposalPayload>(value)
        .map(Payload::Proposal)
        .map_err(decode_error)
}

fn decode_vote(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<VotePayload>(value)
        .map(Payload::Vote)
        .map_err(decode_error)
}

fn decode_decision(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<DecisionPayload>(value)
        .map(Payload::Decision)
        .map_err(decode_error)
}

fn decode_fact(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<FactPayload>(value)
        .map(Payload::Fact)
        .map_err(decode_error)
}

fn decode_presence(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<PresencePayload>(value)
        .map(Payload::Presence)
        .map_err(decode_error)
}

fn decode_capabilities(value: serde_json::Value) -> Result<Payload, DomainError> {
    serde_json::from_value::<CapabilitiesPayload>(value)
        .map(Payload::Capabilities)
        .map_err(decode_error)
}

/// JSON codec for envelopes
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    registry: DecoderRegistry,
}

impl EnvelopeCodec {
    pub fn new(registry: DecoderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, DomainError> {
        let raw = envelope.to_raw()?;
        serde_json::to_vec(&raw).map_err(decode_error)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, DomainError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes).map_err(decode_error)?;
        self.decode_raw(raw)
    }

    pub fn decode_raw(&self, raw: RawEnvelope) -> Result<Envelope, DomainError> {
        validate_base(&raw)?;

        // validate_base guarantees kind and timestamp are present
        let kind = raw.kind.unwrap_or_default();
        let timestamp = raw.timestamp.unwrap_or_default();
        let payload = self.registry.decode(&kind, raw.payload)?;

        Ok(Envelope {
            schema_version: raw.schema_version,
            trace_id: TraceId::new(raw.trace_id),
            timestamp,
            idempotency_key: IdempotencyKey::new(raw.idempotency_key),
            origin_id: AgentId::new(raw.origin_id),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{ProposalId, VoteValue};
    use serde_json::json;

    fn vote_envelope() -> Envelope {
        Envelope::new(
            Payload::Vote(VotePayload {
                proposal_id: ProposalId::new("p-1"),
                voter_id: AgentId::new("scout:1"),
                value: VoteValue::Yes,
                reason: "ok".into(),
                revision: 0,
            }),
            AgentId::new("scout:1"),
            IdempotencyKey::vote("p-1", "scout:1"),
            TraceId::new("trace-1"),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    fn raw_vote() -> serde_json::Value {
        json!({
            "schemaVersion": 1,
            "type": "vote",
            "traceId": "trace-1",
            "timestamp": "2024-05-01T10:00:00Z",
            "idempotencyKey": "knowledge:vote:p-1:scout:1",
            "originId": "scout:1",
            "payload": {"proposalId": "p-1", "voterId": "scout:1", "value": "yes"}
        })
    }

    fn decode_json(value: serde_json::Value) -> Result<Envelope, DomainError> {
        EnvelopeCodec::default().decode(value.to_string().as_bytes())
    }

    #[test]
    fn test_encode_uses_stable_keys() {
        let bytes = EnvelopeCodec::default().encode(&vote_envelope()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for key in [
            "schemaVersion",
            "type",
            "traceId",
            "timestamp",
            "idempotencyKey",
            "originId",
            "payload",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["type"], "vote");
        assert_eq!(value["payload"]["voterId"], "scout:1");
    }

    #[test]
    fn test_decode_encoded_envelope() {
        let codec = EnvelopeCodec::default();
        let envelope = vote_envelope();
        let decoded = codec.decode(&codec.encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_decode_valid_raw() {
        let envelope = decode_json(raw_vote()).unwrap();
        assert_eq!(envelope.kind(), EnvelopeType::Vote);
        assert_eq!(envelope.idempotency_key.as_str(), "knowledge:vote:p-1:scout:1");
    }

    #[test]
    fn test_rejects_unknown_schema_version() {
        let mut value = raw_vote();
        value["schemaVersion"] = json!(7);
        assert_eq!(
            decode_json(value).unwrap_err(),
            DomainError::UnsupportedSchemaVersion(7)
        );
    }

    #[test]
    fn test_rejects_missing_base_fields() {
        for field in ["type", "traceId", "idempotencyKey", "timestamp"] {
            let mut value = raw_vote();
            value.as_object_mut().unwrap().remove(field);
            let err = decode_json(value).unwrap_err();
            assert!(
                matches!(err, DomainError::Validation(_)),
                "{} should fail validation, got {:?}",
                field,
                err
            );
        }
    }

    #[test]
    fn test_rejects_epoch_timestamp() {
        let mut value = raw_vote();
        value["timestamp"] = json!("1970-01-01T00:00:00Z");
        assert!(matches!(
            decode_json(value),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_type() {
        let mut value = raw_vote();
        value["type"] = json!("gossip");
        assert_eq!(
            decode_json(value).unwrap_err(),
            DomainError::UnknownEnvelopeType("gossip".into())
        );
    }

    #[test]
    fn test_rejects_type_without_registered_decoder() {
        let codec = EnvelopeCodec::new(
            DecoderRegistry::empty().with(EnvelopeType::Proposal, decode_proposal),
        );
        let err = codec.decode(raw_vote().to_string().as_bytes()).unwrap_err();
        assert_eq!(err, DomainError::UnknownEnvelopeType("vote".into()));
    }

    #[test]
    fn test_rejects_payload_that_does_not_match_type() {
        let mut value = raw_vote();
        value["payload"] = json!({"group": "ops"});
        assert!(matches!(decode_json(value), Err(DomainError::Decode(_))));
    }

    #[test]
    fn test_registry_debug_lists_types() {
        let debug = format!("{:?}", DecoderRegistry::with_defaults());
        assert!(debug.contains("capabilities"));
        assert!(debug.contains("fact"));
        assert!(debug.contains("vote"));
    }
}
