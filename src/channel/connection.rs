use crate::types::{CLOSE_TIMEOUT, RealtimeError, Result};
use crate::websocket::WsWriter;
use futures::SinkExt;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tungstenite::Message;

/// Owns the write half of the live socket.
///
/// Lock order across the crate is writer first, then channel state. Nobody
/// awaits this lock while holding the state lock.
pub struct ConnectionManager {
    ws_write: Mutex<Option<WsWriter>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: Mutex::new(None),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Option<WsWriter>> {
        self.ws_write.lock().await
    }

    /// Takes the writer out and closes it, if there is one
    pub async fn close(&self) {
        let writer = self.lock().await.take();
        if let Some(writer) = writer {
            close_writer(writer).await;
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes one text frame to the socket behind `writer`
pub async fn write_text(writer: &mut Option<WsWriter>, text: String) -> Result<()> {
    match writer.as_mut() {
        Some(ws) => ws.send(Message::Text(text.into())).await,
        None => Err(RealtimeError::Connection("socket is not open".to_string())),
    }
}

/// Closes the socket gracefully, giving up after `CLOSE_TIMEOUT`
pub async fn close_writer(mut writer: WsWriter) {
    match tokio::time::timeout(Duration::from_millis(CLOSE_TIMEOUT), writer.close()).await {
        Ok(Ok(())) => tracing::debug!("WebSocket closed"),
        Ok(Err(e)) => tracing::debug!("WebSocket close failed: {}", e),
        Err(_) => tracing::warn!("WebSocket close timed out, dropping socket"),
    }
}
