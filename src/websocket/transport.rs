use crate::types::{RealtimeError, Result};
use futures::future::BoxFuture;
use futures::{Sink, Stream};
use std::pin::Pin;
use tungstenite::Message;

/// Inbound half of a socket.
pub type WsReader =
    Pin<Box<dyn Stream<Item = std::result::Result<Message, tungstenite::Error>> + Send>>;

/// Outbound half of a socket.
pub type WsWriter = Pin<Box<dyn Sink<Message, Error = RealtimeError> + Send>>;

/// Transport boundary for websocket IO.
///
/// The channel owns state and policy; a transport only knows how to open a
/// socket. Tests swap in an in-memory implementation.
pub trait WsTransport: Send + Sync + 'static {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<(WsReader, WsWriter)>>;
}

impl<T: WsTransport + ?Sized> WsTransport for std::sync::Arc<T> {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<(WsReader, WsWriter)>> {
        (**self).connect(url)
    }
}
