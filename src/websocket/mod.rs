// WebSocket module - transport boundary and the tungstenite implementation
pub mod factory;
pub mod transport;

pub use factory::{TungsteniteTransport, WebSocketFactory};
pub use transport::{WsReader, WsTransport, WsWriter};
