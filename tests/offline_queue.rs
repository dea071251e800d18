mod common;

use common::*;
use serde_json::json;
use workspace_realtime::channel::Notification;
use workspace_realtime::{ChannelConfig, ConnectionState, SendOutcome};

#[tokio::test(start_paused = true)]
async fn test_send_while_connected_goes_straight_out() {
    let h = harness(test_config());
    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    let outcome = h.channel.send(json!({"type": "chat", "content": "hi"})).await;

    assert_eq!(outcome, SendOutcome::Sent);
    assert_eq!(socket.drain(), vec![json!({"type": "chat", "content": "hi"})]);
    assert_eq!(h.channel.metrics().await.messages_sent, 1);
    assert!(h.channel.queued_messages().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_queued_messages_flush_in_order_on_connect() {
    let h = harness(test_config());

    for n in 0..3 {
        let outcome = h.channel.send(json!({ "n": n })).await;
        assert!(outcome.is_queued());
    }
    assert_eq!(h.channel.queued_messages().await.len(), 3);

    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    assert_eq!(
        socket.drain(),
        vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})]
    );
    assert!(h.channel.queued_messages().await.is_empty());
    assert_eq!(h.channel.metrics().await.messages_sent, 3);
}

#[tokio::test(start_paused = true)]
async fn test_queued_message_precedes_new_sends_after_manual_reconnect() {
    let h = harness(test_config());
    h.channel.connect().await.unwrap();
    h.transport.take_socket().hang_up();
    settle().await;
    assert!(!h.channel.is_connected().await);

    let outcome = h.channel.send(json!("hello")).await;
    let SendOutcome::Queued { id } = outcome else {
        panic!("expected the message to be queued, got {:?}", outcome);
    };
    let queued = h.channel.queued_messages().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, id);

    h.channel.reconnect().await.unwrap();
    assert_eq!(h.channel.connection_state().await, ConnectionState::Connected);
    assert_eq!(h.channel.send(json!("world")).await, SendOutcome::Sent);

    let mut socket = h.transport.take_socket();
    assert_eq!(socket.drain(), vec![json!("hello"), json!("world")]);
    assert!(h.channel.queued_messages().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_evicts_oldest_and_reports_it() {
    let config = ChannelConfig {
        max_queue_size: 2,
        ..test_config()
    };
    let h = harness(config);

    let SendOutcome::Queued { id: first } = h.channel.send(json!("a")).await else {
        panic!("expected queued");
    };
    h.channel.send(json!("b")).await;
    h.channel.send(json!("c")).await;

    let payloads: Vec<_> = h
        .channel
        .queued_messages()
        .await
        .into_iter()
        .map(|m| m.payload)
        .collect();
    assert_eq!(payloads, vec![json!("b"), json!("c")]);
    assert_eq!(h.channel.metrics().await.messages_dropped, 1);
    assert!(
        h.notifier
            .notifications()
            .contains(&Notification::MessageDropped { id: first })
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_after_disconnect_is_discarded() {
    let h = harness(test_config());
    h.channel.send(json!("pending")).await;

    h.channel.disconnect().await;

    assert!(h.channel.queued_messages().await.is_empty());
    assert_eq!(h.channel.metrics().await.messages_dropped, 1);
    assert_eq!(h.channel.send(json!("late")).await, SendOutcome::Closed);
    assert!(h.channel.queued_messages().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_stops_flush_and_keeps_the_rest() {
    let h = harness(test_config());
    for n in 0..3 {
        h.channel.send(json!({ "n": n })).await;
    }
    h.transport.push(Script::AcceptWrites(1));

    h.channel.connect().await.unwrap();
    let mut socket = h.transport.take_socket();

    assert_eq!(socket.drain(), vec![json!({"n": 0})]);
    let remaining: Vec<_> = h
        .channel
        .queued_messages()
        .await
        .into_iter()
        .map(|m| m.payload)
        .collect();
    assert_eq!(remaining, vec![json!({"n": 1}), json!({"n": 2})]);

    let metrics = h.channel.metrics().await;
    assert_eq!(metrics.messages_sent, 1);
    assert_eq!(
        metrics.last_error.as_deref(),
        Some("Connection error: write rejected")
    );
}
