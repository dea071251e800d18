//! # Workspace Realtime
//!
//! A self-healing WebSocket channel for the workspace client's live session
//! traffic. The channel authenticates with a session token, keeps the socket
//! alive with heartbeats, retries with capped exponential backoff when the
//! socket drops, and queues outbound messages while it is offline.
//!
//! ## Example
//!
//! ```no_run
//! use workspace_realtime::{ChannelConfig, ReconnectingChannel, StaticTokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = ReconnectingChannel::builder("wss://api.example.com/realtime", "session-1")
//!         .auth(StaticTokenProvider::new("user-jwt"))
//!         .config(ChannelConfig {
//!             max_retries: 3,
//!             ..Default::default()
//!         })
//!         .on_message(|frame| println!("{}", frame))
//!         .build()?;
//!
//!     channel.connect().await?;
//!     channel.send(serde_json::json!({"type": "hello"})).await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod channel;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use auth::{SessionTokenProvider, SharedTokenProvider, StaticTokenProvider};
pub use channel::{
    ChannelConfig, ConnectionMetrics, ConnectionState, Notification, Notifier,
    ReconnectingChannel, ReconnectingChannelBuilder, SendOutcome, TracingNotifier,
};
pub use infrastructure::{Backoff, RefreshingSessionProvider};
pub use types::{QueuedMessage, RealtimeError, Result};
pub use websocket::{TungsteniteTransport, WsReader, WsTransport, WsWriter};
