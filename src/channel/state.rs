use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status shown to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Constructed, `connect()` not called yet
    #[default]
    Initial,
    Connecting,
    Connected,
    /// Socket closed; a retry decision follows unless the close was ours
    Disconnected,
    /// Waiting on the backoff timer
    Reconnecting,
    /// Socket or precondition error
    Error,
    /// Retries exhausted, only a manual reconnect recovers
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
            Self::Failed => "failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        *self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`send`](crate::ReconnectingChannel::send)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the open socket
    Sent,
    /// Buffered; flushed on the next successful connect
    Queued { id: uuid::Uuid },
    /// Channel was torn down, the message was discarded
    Closed,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}
