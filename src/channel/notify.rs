use super::state::ConnectionState;
use uuid::Uuid;

/// Something the user or the embedding UI may want to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Automatic retries are exhausted; the channel is now `failed`
    RetriesExhausted {
        attempts: u32,
        last_error: Option<String>,
    },
    /// A queued message was evicted because the queue was full
    MessageDropped { id: Uuid },
}

/// Receives channel notifications (toasts, status bars, telemetry).
///
/// Called while the channel holds its state lock: implementations must not
/// block and must not call back into the channel synchronously.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

impl<F> Notifier for F
where
    F: Fn(Notification) + Send + Sync + 'static,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Default notifier: log and move on
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::StateChanged { from, to } => {
                tracing::debug!("Connection state {} -> {}", from, to);
            }
            Notification::RetriesExhausted {
                attempts,
                last_error,
            } => {
                tracing::error!(
                    "Connection failed after {} attempts: {}",
                    attempts,
                    last_error.as_deref().unwrap_or("unknown error")
                );
            }
            Notification::MessageDropped { id } => {
                tracing::warn!("Outbound queue full, dropped message {}", id);
            }
        }
    }
}
