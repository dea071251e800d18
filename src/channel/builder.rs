use super::{ChannelConfig, MessageHandler, Notifier, ReconnectingChannel, TracingNotifier};
use crate::auth::SessionTokenProvider;
use crate::types::{RealtimeError, Result};
use crate::websocket::{TungsteniteTransport, WsTransport};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Builder for [`ReconnectingChannel`].
///
/// An auth provider is required; everything else has a default.
pub struct ReconnectingChannelBuilder {
    endpoint: String,
    session_id: String,
    config: ChannelConfig,
    auth: Option<Box<dyn SessionTokenProvider>>,
    transport: Option<Box<dyn WsTransport>>,
    notifier: Option<Box<dyn Notifier>>,
    handler: Option<MessageHandler>,
}

impl ReconnectingChannelBuilder {
    pub fn new(endpoint: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            session_id: session_id.into(),
            config: ChannelConfig::default(),
            auth: None,
            transport: None,
            notifier: None,
            handler: None,
        }
    }

    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn auth(mut self, provider: impl SessionTokenProvider) -> Self {
        self.auth = Some(Box::new(provider));
        self
    }

    pub fn transport(mut self, transport: impl WsTransport) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Called once per application frame, in order, from the read task.
    /// Runs while the channel's state lock is held: do not block, and hand
    /// any follow-up `send` to a spawned task.
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Validate everything and assemble the channel. Nothing connects yet.
    pub fn build(self) -> Result<ReconnectingChannel> {
        self.config.validate()?;

        let endpoint = Url::parse(&self.endpoint)?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfig(format!(
                "endpoint must use ws:// or wss://, got {}://",
                endpoint.scheme()
            )));
        }
        if self.session_id.trim().is_empty() {
            return Err(RealtimeError::InvalidConfig(
                "session_id must not be empty".to_string(),
            ));
        }
        let auth = self.auth.ok_or_else(|| {
            RealtimeError::InvalidConfig("a session token provider is required".to_string())
        })?;

        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(TungsteniteTransport));
        let notifier = self.notifier.unwrap_or_else(|| Box::new(TracingNotifier));
        let handler = self.handler.unwrap_or_else(|| {
            Arc::new(|frame: Value| tracing::debug!("Unhandled message: {}", frame))
        });

        Ok(ReconnectingChannel::from_parts(
            self.session_id,
            endpoint,
            self.config,
            auth,
            transport,
            notifier,
            handler,
        ))
    }
}
