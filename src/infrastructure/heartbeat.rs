use crate::channel::ChannelInner;
use std::ops::ControlFlow;
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Drives the periodic ping for one socket generation.
pub struct HeartbeatManager {
    interval: Duration,
    generation: u64,
    channel: Weak<ChannelInner>,
}

impl HeartbeatManager {
    pub(crate) fn new(channel: Weak<ChannelInner>, generation: u64) -> Self {
        Self {
            interval: Duration::from_millis(crate::types::HEARTBEAT_INTERVAL),
            generation,
            channel,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Heartbeat loop. The first ping goes out one full interval after open.
    pub async fn run(self) {
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            let Some(channel) = self.channel.upgrade() else {
                // Channel dropped, exit heartbeat task
                break;
            };

            if let ControlFlow::Break(()) = channel.heartbeat_tick(self.generation).await {
                tracing::debug!("Heartbeat for generation {} stopped", self.generation);
                break;
            }
        }
    }
}
