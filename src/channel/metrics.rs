use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Point-in-time view of a channel's counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionMetrics {
    /// Wall-clock time of the last successful open, cleared on teardown
    pub last_connected: Option<SystemTime>,
    /// Failure-triggered retries since the last successful open
    pub reconnect_attempts: u32,
    /// Most recent failure, as displayed text
    pub last_error: Option<String>,
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Queued messages evicted on overflow or discarded on teardown
    pub messages_dropped: u64,
    /// Last heartbeat round trip
    pub latency: Option<Duration>,
    /// Time since open while connected, else the last connected stretch
    pub uptime: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Sent,
    Received,
}

/// Partial update, shallow-merged by [`MetricsTracker::update`].
///
/// `None` leaves a field untouched. Fields that are themselves optional use
/// `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct MetricsUpdate {
    pub last_connected: Option<Option<SystemTime>>,
    pub reconnect_attempts: Option<u32>,
    pub last_error: Option<Option<String>>,
    pub latency: Option<Duration>,
}

impl MetricsUpdate {
    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = Some(attempts);
        self
    }

    pub fn last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(Some(error.into()));
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Counters and timestamps for one channel. Written only by the channel.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    metrics: ConnectionMetrics,
    connected_since: Option<Instant>,
    last_uptime: Duration,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, update: MetricsUpdate) {
        if let Some(last_connected) = update.last_connected {
            self.metrics.last_connected = last_connected;
        }
        if let Some(attempts) = update.reconnect_attempts {
            self.metrics.reconnect_attempts = attempts;
        }
        if let Some(last_error) = update.last_error {
            self.metrics.last_error = last_error;
        }
        if let Some(latency) = update.latency {
            self.metrics.latency = Some(latency);
        }
    }

    pub fn increment_message_count(&mut self, direction: MessageDirection) {
        match direction {
            MessageDirection::Sent => self.metrics.messages_sent += 1,
            MessageDirection::Received => self.metrics.messages_received += 1,
        }
    }

    pub fn record_dropped(&mut self, count: u64) {
        self.metrics.messages_dropped += count;
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.metrics.reconnect_attempts
    }

    /// Socket opened: reset the retry counter and start the uptime clock
    pub fn mark_open(&mut self) {
        self.update(MetricsUpdate {
            last_connected: Some(Some(SystemTime::now())),
            reconnect_attempts: Some(0),
            ..Default::default()
        });
        self.connected_since = Some(Instant::now());
    }

    /// Socket gone: freeze uptime at the length of the stretch that just ended
    pub fn mark_closed(&mut self) {
        if let Some(since) = self.connected_since.take() {
            self.last_uptime = since.elapsed();
        }
    }

    /// Teardown: forget when we were last connected
    pub fn reset_connection(&mut self) {
        self.mark_closed();
        self.metrics.last_connected = None;
    }

    pub fn snapshot(&self) -> ConnectionMetrics {
        let mut snapshot = self.metrics.clone();
        snapshot.uptime = match self.connected_since {
            Some(since) => since.elapsed(),
            None => self.last_uptime,
        };
        snapshot
    }
}
