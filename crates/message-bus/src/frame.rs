//! Wire frames for the TCP bus protocol.
//!
//! One JSON object per line, newline-delimited. The client sends `auth`
//! (when the broker requires credentials), `subscribe`, and `publish`
//! frames; the broker sends `publish` frames on fan-out, `auth_ok` to
//! acknowledge authentication, and `error` before closing a rejected
//! connection.

use crate::message::BusMessage;
use serde::{Deserialize, Serialize};

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Authenticate the connection. Must be the first frame when the broker
    /// is started with credentials.
    Auth { username: String, password: String },

    /// Broker acknowledgement of a successful `auth`.
    AuthOk,

    /// Register interest in a topic (exact match).
    Subscribe { topic: String },

    /// Deliver a message. Client to broker on publish; broker to client on
    /// fan-out.
    Publish { message: BusMessage },

    /// Broker-side rejection, sent just before the connection closes.
    Error { reason: String },
}

impl Frame {
    /// Encode as a single newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse a frame from one line.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
