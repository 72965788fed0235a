//! Bus message shape.

use serde::{Deserialize, Serialize};

/// Out-of-band message properties.
///
/// The RPC layer uses these to correlate replies with calls. A message
/// carrying both a correlation token and a reply topic is an RPC call; a
/// message carrying only the token is a reply; anything else is not RPC
/// traffic and is ignored by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    /// Opaque token linking a reply to its originating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Topic the reply must be published to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_topic: Option<String>,
}

impl MessageProperties {
    /// Properties for an outbound RPC call.
    #[must_use]
    pub fn call(correlation_id: impl Into<String>, reply_topic: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            reply_topic: Some(reply_topic.into()),
        }
    }

    /// Properties for an RPC reply, echoing the call's token.
    #[must_use]
    pub fn reply(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            reply_topic: None,
        }
    }

    /// Whether this message is an RPC call (token and reply topic present).
    #[must_use]
    pub fn is_rpc_call(&self) -> bool {
        self.correlation_id.is_some() && self.reply_topic.is_some()
    }
}

/// A message published to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Destination topic.
    pub topic: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Out-of-band properties.
    #[serde(default)]
    pub properties: MessageProperties,
}

impl BusMessage {
    /// Create a message with empty properties.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            properties: MessageProperties::default(),
        }
    }

    /// Attach properties.
    #[must_use]
    pub fn with_properties(mut self, properties: MessageProperties) -> Self {
        self.properties = properties;
        self
    }
}
