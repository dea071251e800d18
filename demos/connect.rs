use serde_json::json;
use std::time::Duration;
use workspace_realtime::{
    ChannelConfig, ReconnectingChannel, RefreshingSessionProvider, StaticTokenProvider,
};

/// Connect to a live endpoint and print everything it sends
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::var("REALTIME_URL").expect("REALTIME_URL must be set in .env");
    let session_id = std::env::var("SESSION_ID").unwrap_or_else(|_| "demo-session".to_string());

    let builder = ReconnectingChannel::builder(&url, session_id)
        .config(ChannelConfig {
            max_retries: 3,
            heartbeat_interval_ms: 10_000,
            ..Default::default()
        })
        .on_message(|frame| println!("📨 {}", frame));

    // Prefer a refreshable session when auth credentials are available
    let builder = match (
        std::env::var("AUTH_URL"),
        std::env::var("API_KEY"),
        std::env::var("REFRESH_TOKEN"),
    ) {
        (Ok(auth_url), Ok(api_key), Ok(refresh_token)) => {
            builder.auth(RefreshingSessionProvider::new(&auth_url, api_key, refresh_token)?)
        }
        _ => {
            let token = std::env::var("ACCESS_TOKEN").expect("ACCESS_TOKEN must be set in .env");
            builder.auth(StaticTokenProvider::new(token))
        }
    };
    let channel = builder.build()?;

    let mut states = channel.state_changes();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            println!("🔌 State: {}", *states.borrow_and_update());
        }
    });

    println!("📡 Connecting to: {}\n", url);
    channel.connect().await?;

    channel
        .send(json!({"type": "chat", "content": "hello from rust"}))
        .await;

    println!("Press Ctrl+C to disconnect");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(15)) => {
                let metrics = channel.metrics().await;
                println!(
                    "📊 sent={} received={} latency={:?} uptime={:?}",
                    metrics.messages_sent,
                    metrics.messages_received,
                    metrics.latency,
                    metrics.uptime
                );
            }
        }
    }

    channel.disconnect().await;
    println!("Disconnected!");
    Ok(())
}
