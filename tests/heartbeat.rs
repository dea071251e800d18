mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use workspace_realtime::{ChannelConfig, ConnectionState};

fn heartbeat_config() -> ChannelConfig {
    ChannelConfig {
        heartbeat_interval_ms: 1_000,
        ..test_config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_pong_measures_latency() {
    let h = harness(heartbeat_config());
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    // First ping goes out one interval after open
    sleep(Duration::from_millis(999)).await;
    assert!(socket.drain().is_empty());
    sleep(Duration::from_millis(2)).await;
    assert_eq!(socket.drain(), vec![json!({"type": "ping"})]);

    sleep(Duration::from_millis(50)).await;
    socket.send_json(json!({"type": "pong"}));
    settle().await;

    let metrics = h.channel.metrics().await;
    let latency = metrics.latency.expect("latency recorded");
    assert!(latency >= Duration::from_millis(50), "latency {:?}", latency);
    assert!(latency <= Duration::from_millis(55), "latency {:?}", latency);
    assert_eq!(metrics.messages_sent, 0);

    // Pongs are protocol traffic, not application messages
    assert!(h.inbox.frames().is_empty());
    assert_eq!(h.channel.connection_state().await, ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_answered_pings_keep_the_socket_open() {
    let h = harness(heartbeat_config());
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    // Stay just behind each tick
    sleep(Duration::from_millis(1)).await;
    for _ in 0..3 {
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(socket.drain(), vec![json!({"type": "ping"})]);
        socket.send_json(json!({"type": "pong"}));
    }
    sleep(Duration::from_millis(1_000)).await;

    assert_eq!(h.channel.connection_state().await, ConnectionState::Connected);
    assert_eq!(h.transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missed_pong_closes_socket() {
    let h = harness(heartbeat_config());
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    sleep(Duration::from_millis(1_001)).await;
    assert_eq!(socket.drain(), vec![json!({"type": "ping"})]);

    // No pong by the next tick
    sleep(Duration::from_millis(1_000)).await;

    assert_eq!(
        h.channel.connection_state().await,
        ConnectionState::Reconnecting
    );
    let last_error = h.channel.metrics().await.last_error.unwrap();
    assert!(last_error.contains("heartbeat timeout"), "{}", last_error);
    assert!(socket.client_closed());
}

#[tokio::test(start_paused = true)]
async fn test_missed_pong_tolerated_when_disabled() {
    let config = ChannelConfig {
        close_on_missed_pong: false,
        ..heartbeat_config()
    };
    let h = harness(config);
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    sleep(Duration::from_millis(3_001)).await;

    assert_eq!(socket.drain().len(), 3);
    assert_eq!(h.channel.connection_state().await, ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_ping_can_carry_session_token() {
    let config = ChannelConfig {
        heartbeat_includes_token: true,
        ..heartbeat_config()
    };
    let h = harness(config);
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    sleep(Duration::from_millis(1_001)).await;

    assert_eq!(socket.drain(), vec![json!({"type": "ping", "token": TOKEN})]);
}
