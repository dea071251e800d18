// Module declarations
mod builder;
mod config;
mod connection;
mod core;
mod metrics;
mod notify;
mod queue;
mod state;

// Public API exports
pub use builder::ReconnectingChannelBuilder;
pub use config::ChannelConfig;
pub use connection::ConnectionManager;
pub use core::{MessageHandler, ReconnectingChannel};
pub use metrics::{ConnectionMetrics, MessageDirection, MetricsTracker, MetricsUpdate};
pub use notify::{Notification, Notifier, TracingNotifier};
pub use queue::MessageQueue;
pub use state::{ConnectionState, SendOutcome};

pub(crate) use core::ChannelInner;
