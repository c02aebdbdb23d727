//! Pub/sub transport port
//!
//! Delivery is at-least-once: consumers deduplicate on the idempotency key,
//! so a producer may retry a failed publish with the same key.

use agora_domain::IdempotencyKey;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while producing a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Transport closed")]
    Closed,
}

/// Producer side of the message bus
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish `payload` on `topic`, partitioned by `key`
    async fn produce(
        &self,
        topic: &str,
        key: &IdempotencyKey,
        payload: &[u8],
    ) -> Result<(), TransportError>;
}

/// Transport that accepts and drops every message (single-node use)
pub struct NoTransport;

#[async_trait]
impl Transport for NoTransport {
    async fn produce(
        &self,
        _topic: &str,
        _key: &IdempotencyKey,
        _payload: &[u8],
    ) -> Result<(), TransportError> {
        Ok(())
    }
}
