use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

use super::constants::{frame_types, server_status};
use super::error::Result;

/// A decoded inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Server-initiated ping. Unused inbound, ignored.
    Ping,
    /// Heartbeat reply
    Pong,
    /// Server status report, e.g. `{"type":"status","status":"disconnected"}`
    Status { status: String, payload: Value },
    /// Anything else, passed through to the message handler untouched
    Message(Value),
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let frame_type = value.get("type").and_then(Value::as_str);
        match frame_type {
            Some(frame_types::PING) => Self::Ping,
            Some(frame_types::PONG) => Self::Pong,
            Some(frame_types::STATUS) => match value.get("status").and_then(Value::as_str) {
                Some(status) => Self::Status {
                    status: status.to_string(),
                    payload: value.clone(),
                },
                None => Self::Message(value),
            },
            _ => Self::Message(value),
        }
    }

    /// True for a status frame telling us the server dropped our session
    pub fn is_server_disconnect(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status == server_status::DISCONNECTED)
    }
}

/// Frames the channel itself writes to the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    Ping {
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl OutboundFrame {
    pub fn ping(token: Option<String>) -> Self {
        Self::Ping { token }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An outbound payload buffered while the socket was not open.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub payload: Value,
    pub queued_at: Instant,
}

impl QueuedMessage {
    pub fn new(payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            queued_at: Instant::now(),
        }
    }
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
