// Messaging module - inbound frame classification
pub mod router;

pub use router::{MessageRouter, RouteAction};
