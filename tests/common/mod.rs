#![allow(dead_code)]

use futures::channel::mpsc;
use futures::future::{self, BoxFuture, FutureExt};
use futures::{Sink, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tungstenite::Message;
use workspace_realtime::channel::Notification;
use workspace_realtime::{
    ChannelConfig, Notifier, RealtimeError, ReconnectingChannel, Result, StaticTokenProvider,
    WsReader, WsTransport, WsWriter,
};

pub const ENDPOINT: &str = "wss://realtime.test/ws";
pub const SESSION: &str = "session-1";
pub const TOKEN: &str = "jwt-token";

/// What the fake server does with the next connection attempt
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Accept,
    /// Accept, but reject every write after the first `n`
    AcceptWrites(usize),
    Refuse,
}

/// Server end of one accepted fake socket
pub struct ServerSocket {
    pub url: String,
    to_client: mpsc::UnboundedSender<std::result::Result<Message, tungstenite::Error>>,
    from_client: mpsc::UnboundedReceiver<Message>,
}

impl ServerSocket {
    pub fn send_json(&self, value: Value) {
        self.send_raw(value.to_string());
    }

    pub fn send_raw(&self, text: impl Into<String>) {
        let _ = self
            .to_client
            .unbounded_send(Ok(Message::Text(text.into().into())));
    }

    /// Drops the connection without a close frame
    pub fn hang_up(self) {}

    /// Every text frame the client has written so far
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Some(Some(message)) = self.from_client.next().now_or_never() {
            if let Message::Text(text) = message {
                frames.push(serde_json::from_str(text.as_str()).expect("client wrote JSON"));
            }
        }
        frames
    }

    /// Whether the client has closed its write half
    pub fn client_closed(&mut self) -> bool {
        loop {
            match self.from_client.next().now_or_never() {
                Some(Some(_)) => continue,
                Some(None) => return true,
                None => return false,
            }
        }
    }
}

/// Client write half of a fake socket
struct FakeWriter {
    tx: mpsc::UnboundedSender<Message>,
    writes_left: Option<usize>,
    live: Arc<AtomicUsize>,
    released: bool,
}

impl FakeWriter {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Sink<Message> for FakeWriter {
    type Error = RealtimeError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<()> {
        let this = self.get_mut();
        match &mut this.writes_left {
            Some(0) => return Err(RealtimeError::Connection("write rejected".to_string())),
            Some(left) => *left -= 1,
            None => {}
        }
        this.tx
            .unbounded_send(item)
            .map_err(|e| RealtimeError::Connection(e.to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        this.tx.close_channel();
        this.release();
        Poll::Ready(Ok(()))
    }
}

impl Drop for FakeWriter {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<Script>,
    urls: Vec<String>,
    sockets: VecDeque<ServerSocket>,
    live_at_connect: Vec<usize>,
}

/// In-memory transport. Accepts by default; script refusals up front.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
    live: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) -> &Self {
        self.state.lock().unwrap().script.push_back(script);
        self
    }

    pub fn refuse_next(&self, count: usize) -> &Self {
        for _ in 0..count {
            self.push(Script::Refuse);
        }
        self
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().urls.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.state.lock().unwrap().urls.clone()
    }

    /// Client writers still open when each connect attempt started
    pub fn live_at_connect(&self) -> Vec<usize> {
        self.state.lock().unwrap().live_at_connect.clone()
    }

    /// Oldest accepted socket not yet taken by the test
    pub fn take_socket(&self) -> ServerSocket {
        self.state
            .lock()
            .unwrap()
            .sockets
            .pop_front()
            .expect("no accepted socket")
    }
}

impl WsTransport for FakeTransport {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<(WsReader, WsWriter)>> {
        let mut state = self.state.lock().unwrap();
        state.urls.push(url.clone());
        state.live_at_connect.push(self.live.load(Ordering::SeqCst));
        let writes_left = match state.script.pop_front().unwrap_or(Script::Accept) {
            Script::Refuse => {
                return future::ready(Err(RealtimeError::Connection(
                    "connection refused".to_string(),
                )))
                .boxed();
            }
            Script::Accept => None,
            Script::AcceptWrites(n) => Some(n),
        };

        let (to_client, client_rx) = mpsc::unbounded();
        let (client_tx, from_client) = mpsc::unbounded();
        state.sockets.push_back(ServerSocket {
            url,
            to_client,
            from_client,
        });
        self.live.fetch_add(1, Ordering::SeqCst);
        let reader: WsReader = Box::pin(client_rx);
        let writer: WsWriter = Box::pin(FakeWriter {
            tx: client_tx,
            writes_left,
            live: self.live.clone(),
            released: false,
        });
        future::ready(Ok((reader, writer))).boxed()
    }
}

/// Notifier that remembers everything it was told
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn transitions(&self) -> Vec<(String, String)> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::StateChanged { from, to } => {
                    Some((from.to_string(), to.to_string()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn exhausted_count(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::RetriesExhausted { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Messages delivered to the application handler
#[derive(Clone, Default)]
pub struct Inbox {
    frames: Arc<Mutex<Vec<Value>>>,
}

impl Inbox {
    pub fn frames(&self) -> Vec<Value> {
        self.frames.lock().unwrap().clone()
    }
}

/// Token provider that takes its time answering
#[derive(Clone)]
pub struct SlowTokenProvider {
    delay: Duration,
}

impl SlowTokenProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl workspace_realtime::SessionTokenProvider for SlowTokenProvider {
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        async move {
            tokio::time::sleep(self.delay).await;
            Ok(Some(TOKEN.to_string()))
        }
        .boxed()
    }
}

/// Fast retries, and a heartbeat far enough out to stay quiet
pub fn test_config() -> ChannelConfig {
    ChannelConfig {
        initial_delay_ms: 100,
        max_delay_ms: 1_000,
        max_retries: 3,
        heartbeat_interval_ms: 3_600_000,
        ..Default::default()
    }
}

pub struct Harness {
    pub channel: ReconnectingChannel,
    pub transport: FakeTransport,
    pub notifier: RecordingNotifier,
    pub inbox: Inbox,
}

pub fn harness(config: ChannelConfig) -> Harness {
    harness_with_auth(config, StaticTokenProvider::new(TOKEN))
}

pub fn harness_with_auth(
    config: ChannelConfig,
    auth: impl workspace_realtime::SessionTokenProvider,
) -> Harness {
    let transport = FakeTransport::new();
    let notifier = RecordingNotifier::default();
    let inbox = Inbox::default();
    let frames = inbox.frames.clone();

    let channel = ReconnectingChannel::builder(ENDPOINT, SESSION)
        .config(config)
        .auth(auth)
        .transport(transport.clone())
        .notifier(notifier.clone())
        .on_message(move |frame| frames.lock().unwrap().push(frame))
        .build()
        .expect("valid test channel");

    Harness {
        channel,
        transport,
        notifier,
        inbox,
    }
}

/// Let spawned tasks run without moving the clock meaningfully
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
