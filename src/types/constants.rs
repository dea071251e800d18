/// Wire `type` discriminators (magic strings layer)
pub mod frame_types {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const STATUS: &str = "status";
}

/// Values carried in the nested `status` field of a `status` frame
pub mod server_status {
    pub const DISCONNECTED: &str = "disconnected";
}

/// Default query parameter carrying the session token
pub const DEFAULT_TOKEN_PARAM: &str = "token";

/// Query parameter carrying the logical session identifier
pub const SESSION_PARAM: &str = "session_id";

/// Default delay before the first retry (milliseconds)
pub const DEFAULT_INITIAL_DELAY: u64 = 1000;

/// Default backoff ceiling (milliseconds)
pub const DEFAULT_MAX_DELAY: u64 = 30000;

/// Default number of automatic retries before the channel gives up
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30000;

/// Max outbound queue size
pub const MAX_QUEUE_SIZE: usize = 100;

/// Multiplicative jitter applied to every backoff delay (±20%)
pub const JITTER_RATIO: f64 = 0.2;

/// Refresh cached access tokens this long before they expire (seconds)
pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// Upper bound on a graceful socket close (milliseconds)
pub const CLOSE_TIMEOUT: u64 = 2000;
