//! Announce Presence use case: heartbeat and capability advertisement.

use super::governance::GovernanceError;
use crate::context::AppContext;
use agora_domain::envelope::{CapabilitiesPayload, PresencePayload};
use agora_domain::{AgentId, IdempotencyKey, Payload, TraceId};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct AnnounceInput {
    pub group: Option<String>,
    /// Advertised only when present
    pub capabilities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnounceOutput {
    pub group: String,
    pub agent: AgentId,
    pub keys: Vec<IdempotencyKey>,
    pub topics: Vec<String>,
}

pub struct AnnouncePresenceUseCase {
    ctx: AppContext,
}

impl AnnouncePresenceUseCase {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, input: AnnounceInput) -> Result<AnnounceOutput, GovernanceError> {
        let ctx = &self.ctx;
        let group = ctx.config.group_or_default(input.group.as_deref()).to_string();
        let agent = ctx.config.identity().clone();
        let now = ctx.clock.now();
        let trace = TraceId::generate();

        let mut envelopes = vec![ctx.envelope(
            Payload::Presence(PresencePayload {
                group: group.clone(),
                agent_id: agent.clone(),
            }),
            IdempotencyKey::presence(&group, agent.as_str(), now.timestamp()),
            trace.clone(),
        )];

        {
            let _guard = ctx.write_guard().await;
            ctx.knowledge.record_presence(&group, &agent, now).await?;
            if let Some(capabilities) = &input.capabilities {
                ctx.knowledge
                    .record_capabilities(&group, &agent, capabilities, now)
                    .await?;
            }
        }

        if let Some(capabilities) = input.capabilities {
            envelopes.push(ctx.envelope(
                Payload::Capabilities(CapabilitiesPayload {
                    group: group.clone(),
                    agent_id: agent.clone(),
                    capabilities,
                }),
                IdempotencyKey::capabilities(&group, agent.as_str(), now.timestamp()),
                trace,
            ));
        }

        let mut keys = Vec::new();
        let mut topics = Vec::new();
        for envelope in envelopes {
            let key = envelope.idempotency_key.clone();
            ctx.knowledge.mark_applied(&key).await?;
            let topic = ctx
                .publish(&group, &envelope)
                .await
                .map_err(|source| GovernanceError::Publish {
                    key: key.clone(),
                    source,
                })?;
            keys.push(key);
            topics.push(topic);
        }

        info!("Announced {} in {}", agent, group);
        Ok(AnnounceOutput {
            group,
            agent,
            keys,
            topics,
        })
    }
}
