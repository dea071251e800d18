use serde_json::json;
use std::time::Duration;
use workspace_realtime::{ReconnectingChannel, StaticTokenProvider};

/// Queue messages before the socket exists, then watch them flush
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url = std::env::var("REALTIME_URL").expect("REALTIME_URL must be set in .env");
    let token = std::env::var("ACCESS_TOKEN").expect("ACCESS_TOKEN must be set in .env");

    let channel = ReconnectingChannel::builder(&url, "offline-demo")
        .auth(StaticTokenProvider::new(token))
        .build()?;

    println!("✅ Test 1: Sending while offline...");
    for n in 1..=3 {
        let outcome = channel.send(json!({"type": "chat", "n": n})).await;
        println!("   message {} -> {:?}", n, outcome);
    }
    println!("   {} messages queued\n", channel.queued_messages().await.len());

    println!("✅ Test 2: Connecting, queue flushes in order...");
    channel.connect().await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!(
        "   queued={} sent={}\n",
        channel.queued_messages().await.len(),
        channel.metrics().await.messages_sent
    );

    println!("✅ Test 3: Disconnecting...");
    channel.disconnect().await;
    println!("   state: {}", channel.connection_state().await);

    Ok(())
}
