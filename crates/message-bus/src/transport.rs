//! Transport trait and subscription handle.

use crate::message::BusMessage;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Errors from transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The message could not be delivered to the bus.
    #[error("failed to publish to '{topic}': {reason}")]
    PublishFailure { topic: String, reason: String },

    /// The subscription could not be established.
    #[error("failed to subscribe to '{topic}': {reason}")]
    SubscribeFailure { topic: String, reason: String },

    /// The connection to the broker could not be established.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// A fire-and-forget pub/sub transport.
///
/// Implementations deliver published messages to all current subscribers of
/// the exact topic. Delivery guarantees are deliberately weak: messages may
/// be dropped (no subscriber, full buffer) or arrive out of order. The RPC
/// layer compensates with deadlines and correlation tokens.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a message to its topic.
    ///
    /// `Ok` means the transport accepted the message, not that anyone
    /// received it.
    async fn publish(&self, message: BusMessage) -> Result<(), TransportError>;

    /// Subscribe to a topic. Messages published after this call returns are
    /// delivered to the returned handle.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError>;
}

enum SubscriptionInner {
    /// Broadcast fan-out; every subscriber sees every message and filters
    /// by topic locally.
    Broadcast(broadcast::Receiver<BusMessage>),
    /// Pre-filtered channel fed by a demultiplexer (TCP client).
    Channel(mpsc::Receiver<BusMessage>),
}

/// A subscription handle for receiving messages on one topic.
pub struct Subscription {
    topic: String,
    inner: SubscriptionInner,
}

impl Subscription {
    pub(crate) fn broadcast(topic: impl Into<String>, rx: broadcast::Receiver<BusMessage>) -> Self {
        Self {
            topic: topic.into(),
            inner: SubscriptionInner::Broadcast(rx),
        }
    }

    pub(crate) fn channel(topic: impl Into<String>, rx: mpsc::Receiver<BusMessage>) -> Self {
        Self {
            topic: topic.into(),
            inner: SubscriptionInner::Channel(rx),
        }
    }

    /// The subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next message on this topic.
    ///
    /// Returns `None` once the underlying bus or connection is gone. A
    /// lagged broadcast subscriber skips the dropped messages and keeps
    /// receiving.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match &mut self.inner {
                SubscriptionInner::Broadcast(rx) => match rx.recv().await {
                    Ok(message) if message.topic == self.topic => return Some(message),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        debug!(topic = %self.topic, lagged = count, "Subscriber lagged, messages dropped");
                        continue;
                    }
                },
                SubscriptionInner::Channel(rx) => return rx.recv().await,
            }
        }
    }
}
