use crate::types::{InboundFrame, RealtimeError, server_status};
use serde_json::Value;
use tungstenite::Message;

/// What the channel should do with one socket message.
#[derive(Debug)]
pub enum RouteAction {
    /// Forward to the application's message handler
    Deliver(Value),
    /// Heartbeat reply, feeds the latency measurement
    Pong,
    /// Server reported our session as disconnected
    ServerDisconnect(Value),
    /// Frame could not be decoded
    Malformed(RealtimeError),
    /// Peer closed the socket
    Closed { code: Option<u16>, reason: String },
    /// Nothing to do (protocol ping/pong, binary, inbound app-level ping)
    Ignore,
}

impl RouteAction {
    /// Whether the frame counts toward `messages_received`
    pub fn is_inbound_message(&self) -> bool {
        matches!(
            self,
            Self::Deliver(_) | Self::Pong | Self::ServerDisconnect(_) | Self::Malformed(_)
        )
    }
}

/// Classifies incoming socket messages
pub struct MessageRouter;

impl MessageRouter {
    pub fn route(message: Message) -> RouteAction {
        match message {
            Message::Text(text) => Self::route_text(text.as_str()),
            Message::Close(frame) => match frame {
                Some(close_frame) => {
                    tracing::warn!(
                        "Server closed connection: code={:?}, reason='{}'",
                        close_frame.code,
                        close_frame.reason.as_str()
                    );
                    RouteAction::Closed {
                        code: Some(u16::from(close_frame.code)),
                        reason: close_frame.reason.as_str().to_string(),
                    }
                }
                None => {
                    tracing::warn!("Server closed connection without close frame");
                    RouteAction::Closed {
                        code: None,
                        reason: String::new(),
                    }
                }
            },
            Message::Ping(data) => {
                tracing::debug!("Received ping ({} bytes)", data.len());
                RouteAction::Ignore
            }
            Message::Pong(data) => {
                tracing::debug!("Received pong ({} bytes)", data.len());
                RouteAction::Ignore
            }
            Message::Binary(data) => {
                tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                RouteAction::Ignore
            }
            Message::Frame(_) => {
                tracing::debug!("Received raw frame (internal)");
                RouteAction::Ignore
            }
        }
    }

    fn route_text(text: &str) -> RouteAction {
        tracing::debug!("Received text message: {}", text);
        match InboundFrame::parse(text) {
            Ok(InboundFrame::Pong) => RouteAction::Pong,
            Ok(InboundFrame::Ping) => RouteAction::Ignore,
            Ok(InboundFrame::Status { status, payload })
                if status == server_status::DISCONNECTED =>
            {
                RouteAction::ServerDisconnect(payload)
            }
            Ok(InboundFrame::Status { payload, .. }) => RouteAction::Deliver(payload),
            Ok(InboundFrame::Message(value)) => RouteAction::Deliver(value),
            Err(e) => {
                tracing::error!("Failed to parse message: {} - Raw: {}", e, text);
                RouteAction::Malformed(e)
            }
        }
    }
}
