use super::{
    ChannelConfig, ConnectionMetrics, ConnectionState, MessageQueue, Notification, Notifier,
    ReconnectingChannelBuilder, SendOutcome,
    connection::{ConnectionManager, close_writer, write_text},
    metrics::{MessageDirection, MetricsTracker, MetricsUpdate},
};
use crate::auth::SessionTokenProvider;
use crate::infrastructure::{Backoff, HeartbeatManager, TaskManager, TaskSlot};
use crate::messaging::{MessageRouter, RouteAction};
use crate::types::{OutboundFrame, QueuedMessage, RealtimeError, Result, SESSION_PARAM};
use crate::websocket::{WsReader, WsTransport, WsWriter, factory::redact_query};
use futures::StreamExt;
use serde_json::Value;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, RwLockWriteGuard, watch};
use tokio::time::Instant;
use url::Url;

/// Callback receiving every application frame, in arrival order
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// Why a live socket went away
#[derive(Debug, Clone)]
struct SocketLoss {
    state: ConnectionState,
    reason: String,
}

impl SocketLoss {
    fn closed(reason: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reason: reason.into(),
        }
    }

    fn error(reason: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Error,
            reason: reason.into(),
        }
    }
}

/// Consolidated mutable state, guarded by one lock
pub(crate) struct LifecycleState {
    status: ConnectionState,
    metrics: MetricsTracker,
    queue: MessageQueue,
    tasks: TaskManager,
    /// Bumped whenever a socket is opened or invalidated; events from an
    /// older generation are ignored
    generation: u64,
    /// Re-entrancy guard for `connect()`
    connecting: bool,
    /// Set once by `disconnect()`, never cleared
    torn_down: bool,
    /// Send time of the ping still waiting for its pong
    pending_ping: Option<Instant>,
}

impl LifecycleState {
    fn new(max_queue_size: usize) -> Self {
        Self {
            status: ConnectionState::Initial,
            metrics: MetricsTracker::new(),
            queue: MessageQueue::new(max_queue_size),
            tasks: TaskManager::new(),
            generation: 0,
            connecting: false,
            torn_down: false,
            pending_ping: None,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }
}

pub(crate) struct ChannelInner {
    session_id: String,
    endpoint: Url,
    config: ChannelConfig,
    backoff: Backoff,
    auth: Box<dyn SessionTokenProvider>,
    transport: Box<dyn WsTransport>,
    notifier: Box<dyn Notifier>,
    handler: MessageHandler,
    connection: ConnectionManager,
    state: RwLock<LifecycleState>,
    state_tx: watch::Sender<ConnectionState>,
    self_ref: Weak<ChannelInner>,
}

/// A WebSocket channel that keeps itself connected.
///
/// The channel fetches a session token, opens the socket, pings on a fixed
/// interval, and on any failure retries with capped exponential backoff until
/// `max_retries` is spent. Messages sent while the socket is down are queued
/// and flushed, in order, as soon as it opens again.
///
/// Cloning is cheap; all clones drive the same socket. Dropping the last
/// clone stops every background task.
///
/// # Example
///
/// ```no_run
/// use workspace_realtime::{ReconnectingChannel, StaticTokenProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = ReconnectingChannel::builder("wss://api.example.com/realtime", "chat-42")
///     .auth(StaticTokenProvider::new("user-jwt"))
///     .on_message(|frame| println!("received {}", frame))
///     .build()?;
///
/// channel.connect().await?;
/// channel.send(serde_json::json!({"type": "chat", "content": "hello"})).await;
/// channel.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReconnectingChannel {
    inner: Arc<ChannelInner>,
}

impl ReconnectingChannel {
    pub fn builder(
        endpoint: impl Into<String>,
        session_id: impl Into<String>,
    ) -> ReconnectingChannelBuilder {
        ReconnectingChannelBuilder::new(endpoint, session_id)
    }

    pub(crate) fn from_parts(
        session_id: String,
        endpoint: Url,
        config: ChannelConfig,
        auth: Box<dyn SessionTokenProvider>,
        transport: Box<dyn WsTransport>,
        notifier: Box<dyn Notifier>,
        handler: MessageHandler,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Initial);
        let inner = Arc::new_cyclic(|self_ref| ChannelInner {
            session_id,
            endpoint,
            backoff: config.backoff(),
            state: RwLock::new(LifecycleState::new(config.max_queue_size)),
            config,
            auth,
            transport,
            notifier,
            handler,
            connection: ConnectionManager::new(),
            state_tx,
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    /// Opens the socket.
    ///
    /// Returns immediately if the channel is already connected or another
    /// `connect()` is in flight. Failures other than a missing session are
    /// also handed to the retry machinery before being returned here.
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::NoSession`] when the auth provider has no token; no
    ///   retry is scheduled.
    /// - [`RealtimeError::ChannelClosed`] after [`disconnect()`](Self::disconnect).
    /// - The token or transport error that failed this attempt.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    /// Tears the channel down for good.
    ///
    /// Cancels the pending retry, stops the heartbeat, closes the socket, and
    /// discards queued messages. Calling it again is a no-op.
    pub async fn disconnect(&self) {
        self.inner.disconnect().await
    }

    /// Manual retry: resets the attempt counter and connects from scratch,
    /// closing the current socket first if there is one.
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.reconnect().await
    }

    /// Sends `payload` now if connected, otherwise queues it
    pub async fn send(&self, payload: Value) -> SendOutcome {
        self.inner.send(payload).await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.state.read().await.status
    }

    pub async fn is_connected(&self) -> bool {
        self.connection_state().await.is_connected()
    }

    pub async fn metrics(&self) -> ConnectionMetrics {
        self.inner.state.read().await.metrics.snapshot()
    }

    /// Messages waiting for the next successful connect, oldest first
    pub async fn queued_messages(&self) -> Vec<QueuedMessage> {
        self.inner.state.read().await.queue.dequeue_all()
    }

    /// Watch receiver that always holds the latest connection state
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }
}

impl ChannelInner {
    /// Set connection state and notify watchers
    fn transition(&self, state: &mut LifecycleState, to: ConnectionState) {
        if state.torn_down || state.status == to {
            return;
        }
        let from = state.status;
        state.status = to;
        self.state_tx.send_replace(to);
        self.notifier.notify(Notification::StateChanged { from, to });
    }

    fn socket_url(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(&self.config.token_param, token)
            .append_pair(SESSION_PARAM, &self.session_id);
        url
    }

    async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.torn_down {
                return Err(RealtimeError::ChannelClosed);
            }
            if state.connecting || state.status == ConnectionState::Connected {
                tracing::debug!("Already connected or connecting, skipping connect");
                return Ok(());
            }
            // This attempt replaces any pending backoff timer
            state.tasks.abort(TaskSlot::Retry);
            state.connecting = true;
            self.transition(&mut state, ConnectionState::Connecting);
        }

        let token = match self.auth.session_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.precondition_failed().await;
                return Err(RealtimeError::NoSession);
            }
            Err(e) => {
                tracing::error!("Session token retrieval failed: {}", e);
                self.attempt_failed(e.to_string()).await;
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            if state.torn_down {
                state.connecting = false;
                tracing::debug!("Channel torn down during token fetch, not opening a socket");
                return Err(RealtimeError::ChannelClosed);
            }
        }

        // At most one live socket per channel
        self.connection.close().await;

        let url = self.socket_url(&token);
        tracing::info!("Connecting to {}", redact_query(url.as_str()));

        match self.transport.connect(url.to_string()).await {
            Ok((reader, writer)) => self.on_open(reader, writer).await,
            Err(e) => {
                tracing::error!("Connection attempt failed: {}", e);
                self.attempt_failed(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn on_open(&self, reader: WsReader, writer: WsWriter) -> Result<()> {
        let mut ws_guard = self.connection.lock().await;
        let (generation, backlog) = {
            let mut state = self.state.write().await;
            state.connecting = false;
            if state.torn_down {
                drop(state);
                tracing::debug!("Channel torn down while connecting, dropping new socket");
                close_writer(writer).await;
                return Err(RealtimeError::ChannelClosed);
            }

            state.generation += 1;
            let generation = state.generation;
            state.pending_ping = None;
            state.metrics.mark_open();
            self.transition(&mut state, ConnectionState::Connected);

            state.tasks.spawn(
                TaskSlot::Reader,
                read_loop(self.self_ref.clone(), generation, reader),
            );
            let heartbeat = HeartbeatManager::new(self.self_ref.clone(), generation)
                .with_interval(self.config.heartbeat_interval());
            state.tasks.spawn(TaskSlot::Heartbeat, heartbeat.run());

            (generation, state.queue.dequeue_all())
        };
        *ws_guard = Some(writer);
        tracing::info!("Connected to WebSocket server");

        if !backlog.is_empty() {
            self.flush_queue(&mut ws_guard, generation, backlog).await;
        }
        Ok(())
    }

    /// Sends queued messages oldest first. Stops at the first rejected write;
    /// whatever is left stays queued for the next open.
    async fn flush_queue(
        &self,
        writer: &mut Option<WsWriter>,
        generation: u64,
        backlog: Vec<QueuedMessage>,
    ) {
        tracing::debug!("Flushing {} queued messages", backlog.len());
        for message in backlog {
            if !self.state.read().await.is_current(generation) {
                return;
            }
            match write_text(writer, message.payload.to_string()).await {
                Ok(()) => {
                    let mut state = self.state.write().await;
                    state.queue.remove(message.id);
                    state.metrics.increment_message_count(MessageDirection::Sent);
                }
                Err(e) => {
                    tracing::warn!(
                        "Flush aborted, socket rejected queued message {}: {}",
                        message.id,
                        e
                    );
                    let mut state = self.state.write().await;
                    state
                        .metrics
                        .update(MetricsUpdate::default().last_error(e.to_string()));
                    return;
                }
            }
        }
    }

    async fn send(&self, payload: Value) -> SendOutcome {
        {
            let mut state = self.state.write().await;
            if state.torn_down {
                tracing::warn!("Send on a closed channel, message discarded");
                return SendOutcome::Closed;
            }
            if state.status != ConnectionState::Connected {
                return self.enqueue(&mut state, payload);
            }
        }

        let mut ws_guard = self.connection.lock().await;
        if ws_guard.is_none() {
            // Socket lost in between; its loss reason is already recorded
            drop(ws_guard);
            let mut state = self.state.write().await;
            if state.torn_down {
                return SendOutcome::Closed;
            }
            tracing::debug!("Socket already closed, queueing message");
            return self.enqueue(&mut state, payload);
        }
        match write_text(&mut ws_guard, payload.to_string()).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.metrics.increment_message_count(MessageDirection::Sent);
                SendOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("Send failed, queueing message: {}", e);
                let mut state = self.state.write().await;
                if state.torn_down {
                    return SendOutcome::Closed;
                }
                state
                    .metrics
                    .update(MetricsUpdate::default().last_error(e.to_string()));
                self.enqueue(&mut state, payload)
            }
        }
    }

    fn enqueue(&self, state: &mut LifecycleState, payload: Value) -> SendOutcome {
        let message = QueuedMessage::new(payload);
        let id = message.id;
        if let Some(evicted) = state.queue.enqueue(message) {
            tracing::warn!(
                "Outbound queue full ({}), evicting oldest message {}",
                state.queue.max_size(),
                evicted.id
            );
            state.metrics.record_dropped(1);
            self.notifier
                .notify(Notification::MessageDropped { id: evicted.id });
        }
        tracing::debug!("Queued message {} ({} pending)", id, state.queue.len());
        SendOutcome::Queued { id }
    }

    /// Heartbeat tick for socket `generation`
    pub(crate) async fn heartbeat_tick(&self, generation: u64) -> ControlFlow<()> {
        {
            let state = self.state.read().await;
            if !state.is_current(generation) {
                return ControlFlow::Break(());
            }
            if state.pending_ping.is_some() && self.config.close_on_missed_pong {
                drop(state);
                tracing::warn!("[Heartbeat] Timeout detected, closing connection");
                self.socket_lost(
                    generation,
                    SocketLoss::error("heartbeat timeout: no pong received"),
                    TaskSlot::Heartbeat,
                )
                .await;
                return ControlFlow::Break(());
            }
        }

        let token = if self.config.heartbeat_includes_token {
            match self.auth.session_token().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("[Heartbeat] Token refresh failed, sending bare ping: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let ping = match OutboundFrame::ping(token).to_json() {
            Ok(ping) => ping,
            Err(e) => {
                tracing::error!("[Heartbeat] Failed to encode ping: {}", e);
                return ControlFlow::Continue(());
            }
        };

        let mut ws_guard = self.connection.lock().await;
        {
            // Record before writing so a fast pong always finds it
            let mut state = self.state.write().await;
            if !state.is_current(generation) {
                return ControlFlow::Break(());
            }
            state.pending_ping = Some(Instant::now());
        }
        match write_text(&mut ws_guard, ping).await {
            Ok(()) => tracing::debug!("Sent heartbeat for generation {}", generation),
            Err(e) => {
                tracing::error!("[Heartbeat] Failed to send: {}", e);
                let mut state = self.state.write().await;
                if state.is_current(generation) {
                    state.pending_ping = None;
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Acts on one classified inbound message from socket `generation`
    async fn handle_action(&self, generation: u64, action: RouteAction) -> ControlFlow<SocketLoss> {
        let mut state = self.state.write().await;
        if !state.is_current(generation) {
            return ControlFlow::Break(SocketLoss::closed("stale socket"));
        }
        if action.is_inbound_message() {
            state
                .metrics
                .increment_message_count(MessageDirection::Received);
        }

        match action {
            RouteAction::Deliver(value) => {
                // Hold the state lock (read) while the handler runs so a
                // concurrent teardown cannot complete in between.
                let _state = RwLockWriteGuard::downgrade(state);
                (self.handler)(value);
                ControlFlow::Continue(())
            }
            RouteAction::Pong => {
                match state.pending_ping.take() {
                    Some(sent_at) => {
                        let latency = sent_at.elapsed();
                        state.metrics.update(MetricsUpdate::default().latency(latency));
                        tracing::debug!("Received heartbeat ack, latency {:?}", latency);
                    }
                    None => tracing::debug!("Received unsolicited pong"),
                }
                ControlFlow::Continue(())
            }
            RouteAction::ServerDisconnect(payload) => {
                tracing::warn!("Server reported session disconnected: {}", payload);
                ControlFlow::Break(SocketLoss::error("server reported session disconnected"))
            }
            RouteAction::Malformed(e) => {
                let reason = format!("malformed frame: {}", e);
                if self.config.reconnect_on_malformed_frame {
                    ControlFlow::Break(SocketLoss::error(reason))
                } else {
                    state.metrics.update(MetricsUpdate::default().last_error(reason));
                    ControlFlow::Continue(())
                }
            }
            RouteAction::Closed { code, reason } => {
                let reason = match code {
                    Some(code) => format!("closed by server (code {}): {}", code, reason),
                    None => "closed by server".to_string(),
                };
                ControlFlow::Break(SocketLoss::closed(reason))
            }
            RouteAction::Ignore => ControlFlow::Continue(()),
        }
    }

    /// Socket `generation` died. `origin` is the task reporting it, which
    /// must not be aborted from under itself.
    async fn socket_lost(&self, generation: u64, loss: SocketLoss, origin: TaskSlot) {
        let writer = {
            let mut ws_guard = self.connection.lock().await;
            let mut state = self.state.write().await;
            if !state.is_current(generation) {
                return;
            }
            tracing::warn!("Connection lost: {}", loss.reason);

            state.generation += 1;
            for slot in [TaskSlot::Heartbeat, TaskSlot::Reader] {
                if slot == origin {
                    state.tasks.detach(slot);
                } else {
                    state.tasks.abort(slot);
                }
            }
            state.pending_ping = None;
            state.metrics.mark_closed();
            state
                .metrics
                .update(MetricsUpdate::default().last_error(loss.reason));
            self.transition(&mut state, loss.state);
            self.schedule_retry(&mut state);
            ws_guard.take()
        };

        if let Some(writer) = writer {
            close_writer(writer).await;
        }
    }

    /// A connect attempt failed before the socket opened
    async fn attempt_failed(&self, reason: String) {
        let mut state = self.state.write().await;
        state.connecting = false;
        if state.torn_down {
            return;
        }
        state.metrics.update(MetricsUpdate::default().last_error(reason));
        self.transition(&mut state, ConnectionState::Error);
        self.schedule_retry(&mut state);
    }

    /// No session token: surface it and stay put, retrying cannot help
    async fn precondition_failed(&self) {
        let mut state = self.state.write().await;
        state.connecting = false;
        if state.torn_down {
            return;
        }
        tracing::warn!("No authenticated session, not connecting");
        state.metrics.update(
            MetricsUpdate::default().last_error(RealtimeError::NoSession.to_string()),
        );
        self.transition(&mut state, ConnectionState::Error);
    }

    /// Either arms the backoff timer or gives up for good
    fn schedule_retry(&self, state: &mut LifecycleState) {
        let attempts = state.metrics.reconnect_attempts();
        if attempts >= self.config.max_retries {
            self.transition(state, ConnectionState::Failed);
            let last_error = state.metrics.snapshot().last_error;
            tracing::error!(
                "Giving up on {} after {} reconnection attempts",
                self.session_id,
                attempts
            );
            self.notifier.notify(Notification::RetriesExhausted {
                attempts,
                last_error,
            });
            return;
        }

        let delay = self.backoff.next_delay(attempts);
        state
            .metrics
            .update(MetricsUpdate::default().reconnect_attempts(attempts + 1));
        self.transition(state, ConnectionState::Reconnecting);
        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            attempts + 1,
            self.config.max_retries
        );

        let channel = self.self_ref.clone();
        state.tasks.spawn(TaskSlot::Retry, async move {
            tokio::time::sleep(delay).await;
            if let Some(channel) = channel.upgrade() {
                channel.retry_now().await;
            }
        });
    }

    async fn retry_now(&self) {
        {
            let mut state = self.state.write().await;
            state.tasks.detach(TaskSlot::Retry);
            if state.torn_down {
                return;
            }
        }
        tracing::info!("Attempting to reconnect...");
        if let Err(e) = self.connect().await {
            tracing::error!("Reconnection attempt failed: {}", e);
        }
    }

    async fn reconnect(&self) -> Result<()> {
        let writer = {
            let mut ws_guard = self.connection.lock().await;
            let mut state = self.state.write().await;
            if state.torn_down {
                return Err(RealtimeError::ChannelClosed);
            }
            state.metrics.update(MetricsUpdate::default().reconnect_attempts(0));
            if state.connecting {
                return Ok(());
            }

            state.tasks.abort(TaskSlot::Retry);
            state.tasks.abort(TaskSlot::Heartbeat);
            state.tasks.abort(TaskSlot::Reader);
            state.generation += 1;
            state.pending_ping = None;
            if state.status == ConnectionState::Connected {
                state.metrics.mark_closed();
                self.transition(&mut state, ConnectionState::Disconnected);
            }
            ws_guard.take()
        };
        if let Some(writer) = writer {
            close_writer(writer).await;
        }

        tracing::info!("Manual reconnect requested for {}", self.session_id);
        self.connect().await
    }

    async fn disconnect(&self) {
        let writer = {
            let mut ws_guard = self.connection.lock().await;
            let mut state = self.state.write().await;
            if state.torn_down {
                return;
            }
            tracing::info!("Disconnecting from WebSocket server");

            state.tasks.abort(TaskSlot::Retry);
            state.tasks.abort(TaskSlot::Heartbeat);
            let writer = ws_guard.take();
            state.tasks.abort(TaskSlot::Reader);

            state.generation += 1;
            state.connecting = false;
            state.pending_ping = None;
            state.metrics.reset_connection();
            let discarded = state.queue.clear();
            if discarded > 0 {
                tracing::warn!("Discarding {} queued messages on disconnect", discarded);
                state.metrics.record_dropped(discarded as u64);
            }
            self.transition(&mut state, ConnectionState::Disconnected);
            state.torn_down = true;
            writer
        };

        if let Some(writer) = writer {
            close_writer(writer).await;
        }
        tracing::info!("Disconnected from WebSocket server");
    }
}

async fn read_loop(channel: Weak<ChannelInner>, generation: u64, mut reader: WsReader) {
    tracing::debug!("Starting read task for generation {}", generation);
    let loss = loop {
        let Some(next) = reader.next().await else {
            break SocketLoss::closed("connection closed by peer");
        };
        let Some(inner) = channel.upgrade() else {
            return;
        };
        match next {
            Ok(message) => {
                let action = MessageRouter::route(message);
                if let ControlFlow::Break(loss) = inner.handle_action(generation, action).await {
                    break loss;
                }
            }
            Err(e) => {
                tracing::error!("WebSocket read error: {}", e);
                break SocketLoss::error(format!("websocket error: {}", e));
            }
        }
    };

    if let Some(inner) = channel.upgrade() {
        inner.socket_lost(generation, loss, TaskSlot::Reader).await;
    }
    tracing::debug!("Read task for generation {} finished", generation);
}
