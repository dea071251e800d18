use crate::infrastructure::Backoff;
use crate::types::{
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_TOKEN_PARAM,
    HEARTBEAT_INTERVAL, MAX_QUEUE_SIZE, RealtimeError, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one reconnecting channel.
///
/// Every former call site of the reconnect logic becomes one of these. All
/// durations are in milliseconds. Missing fields take their defaults when
/// deserialized, so `{"max_retries": 3}` is a complete config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Automatic retries before the channel enters `failed`; 0 fails on the
    /// first loss
    pub max_retries: u32,
    /// Heartbeat period
    pub heartbeat_interval_ms: u64,
    /// Outbound queue bound; the oldest entry is evicted past it
    pub max_queue_size: usize,
    /// Attach a freshly fetched session token to every ping
    pub heartbeat_includes_token: bool,
    /// Treat an unanswered ping at the next heartbeat as a dead socket
    pub close_on_missed_pong: bool,
    /// Treat an undecodable inbound frame as a transport error
    pub reconnect_on_malformed_frame: bool,
    /// Query parameter carrying the token in the socket URL
    pub token_param: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY,
            max_delay_ms: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL,
            max_queue_size: MAX_QUEUE_SIZE,
            heartbeat_includes_token: false,
            close_on_missed_pong: true,
            reconnect_on_malformed_frame: true,
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(RealtimeError::InvalidConfig(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(RealtimeError::InvalidConfig(
                "heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(RealtimeError::InvalidConfig(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        if self.token_param.is_empty() {
            return Err(RealtimeError::InvalidConfig(
                "token_param must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::from_millis(self.initial_delay_ms, self.max_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
