use thiserror::Error;

/// Errors that can occur when using a reconnecting channel.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// The auth collaborator failed to produce a token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No authenticated session is available; the user must sign in again
    #[error("No authenticated session")]
    NoSession,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (session token refresh)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Rejected channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The channel was torn down and can no longer be used
    #[error("Channel closed")]
    ChannelClosed,
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
