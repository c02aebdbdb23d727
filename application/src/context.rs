//! Shared application context handed to every use case.

use crate::config::AgoraConfig;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::cascade_store::CascadeStore;
use crate::ports::clock::{Clock, SystemClock};
use crate::ports::knowledge_store::KnowledgeStore;
use crate::ports::transport::{Transport, TransportError};
use agora_domain::envelope::topic;
use agora_domain::{Envelope, EnvelopeCodec, IdempotencyKey, Payload, TraceId};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Dependencies and configuration of one node.
///
/// Cloning is cheap; clones share the same stores and the same writer lock.
#[derive(Clone)]
pub struct AppContext {
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub cascade: Arc<dyn CascadeStore>,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditLogger>,
    pub codec: EnvelopeCodec,
    pub config: AgoraConfig,
    /// Serializes vote upsert, decision recompute and fact write on this node
    write_lock: Arc<Mutex<()>>,
}

impl AppContext {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        cascade: Arc<dyn CascadeStore>,
        transport: Arc<dyn Transport>,
        config: AgoraConfig,
    ) -> Self {
        Self {
            knowledge,
            cascade,
            transport,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoAuditLogger),
            codec: EnvelopeCodec::default(),
            config,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_codec(mut self, codec: EnvelopeCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Take the single-writer lock
    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub fn audit(&self, event_type: &'static str, payload: serde_json::Value) {
        self.audit.record(AuditEvent::new(event_type, payload));
    }

    /// Wrap `payload` in an envelope originating from this node
    pub fn envelope(&self, payload: Payload, key: IdempotencyKey, trace_id: TraceId) -> Envelope {
        Envelope::new(
            payload,
            self.config.identity().clone(),
            key,
            trace_id,
            self.clock.now(),
        )
    }

    /// Encode and produce an envelope on its group topic
    pub async fn publish(&self, group: &str, envelope: &Envelope) -> Result<String, TransportError> {
        let topic = topic(group, envelope.kind().topic_kind());
        let bytes = self
            .codec
            .encode(envelope)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        match self
            .transport
            .produce(&topic, &envelope.idempotency_key, &bytes)
            .await
        {
            Ok(()) => {
                debug!("Published {} on {}", envelope.idempotency_key, topic);
                Ok(topic)
            }
            Err(e) => {
                warn!(
                    "Publish of {} on {} failed: {}",
                    envelope.idempotency_key, topic, e
                );
                Err(e)
            }
        }
    }
}
