//! In-process bus implementation.
//!
//! Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
//! semantics. Suitable for single-process deployments and tests; multi-
//! process deployments use [`crate::tcp::TcpBus`] against the broker.

use crate::message::BusMessage;
use crate::transport::{Subscription, Transport, TransportError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// In-memory implementation of the message bus.
pub struct InMemoryBus {
    /// Broadcast sender for all topics; subscribers filter locally.
    sender: broadcast::Sender<BusMessage>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Number of active subscribers across all topics.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total messages published since creation.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryBus {
    async fn publish(&self, message: BusMessage) -> Result<(), TransportError> {
        let topic = message.topic.clone();
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(message) {
            Ok(receiver_count) => {
                debug!(topic = %topic, receivers = receiver_count, "Message published");
                Ok(())
            }
            Err(_) => {
                // Fire-and-forget: no subscriber means the message is lost,
                // which is not an error at this layer.
                warn!(topic = %topic, "Message dropped (no subscribers)");
                Ok(())
            }
        }
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        debug!(topic = %topic, "New subscription created");
        Ok(Subscription::broadcast(topic, self.sender.subscribe()))
    }
}
