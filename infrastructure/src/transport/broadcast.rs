//! In-process message bus over a tokio broadcast channel.
//!
//! Every node sharing the bus sees every message, so several peers can run
//! inside one process. A lagging subscriber loses the oldest messages.

use agora_application::{Transport, TransportError};
use agora_domain::IdempotencyKey;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 1024;

/// One message as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub key: IdempotencyKey,
    pub payload: Vec<u8>,
}

#[derive(Clone)]
pub struct BroadcastTransport {
    sender: broadcast::Sender<BusMessage>,
}

impl BroadcastTransport {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for BroadcastTransport {
    async fn produce(
        &self,
        topic: &str,
        key: &IdempotencyKey,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let message = BusMessage {
            topic: topic.to_string(),
            key: key.clone(),
            payload: payload.to_vec(),
        };
        match self.sender.send(message) {
            Ok(receivers) => debug!("{} delivered to {} subscriber(s)", key, receivers),
            // nobody listening is not a producer error
            Err(_) => debug!("{} published with no subscribers", key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = BroadcastTransport::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let key = IdempotencyKey::proposal("p-1");
        bus.produce("ops.knowledge.proposals", &key, b"{}")
            .await
            .unwrap();

        for rx in [&mut a, &mut b] {
            let message = rx.recv().await.unwrap();
            assert_eq!(message.topic, "ops.knowledge.proposals");
            assert_eq!(message.key, key);
            assert_eq!(message.payload, b"{}".to_vec());
        }
    }

    #[tokio::test]
    async fn test_produce_without_subscribers_succeeds() {
        let bus = BroadcastTransport::new();
        let key = IdempotencyKey::proposal("p-1");
        assert!(bus.produce("t", &key, b"{}").await.is_ok());
    }
}
