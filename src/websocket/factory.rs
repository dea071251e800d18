use super::transport::{WsReader, WsTransport, WsWriter};
use crate::types::{RealtimeError, Result};
use futures::future::{BoxFuture, FutureExt};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// WebSocket factory for creating WebSocket connections
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Open a WebSocket connection, TLS included for `wss://` URLs
    pub async fn create(url: &str) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        tracing::debug!("Creating WebSocket connection to: {}", redact_query(url));
        let (ws_stream, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!("WebSocket handshake completed with status {}", response.status());
        Ok(ws_stream)
    }
}

/// Production transport on top of `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl WsTransport for TungsteniteTransport {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<(WsReader, WsWriter)>> {
        async move {
            let ws_stream = WebSocketFactory::create(&url).await?;
            let (write_half, read_half) = ws_stream.split();
            let reader: WsReader = Box::pin(read_half);
            let writer: WsWriter = Box::pin(write_half.sink_map_err(RealtimeError::from));
            Ok((reader, writer))
        }
        .boxed()
    }
}

/// Strip the query string so tokens never reach the logs
pub(crate) fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
