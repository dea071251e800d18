//! Session token accessors.
//!
//! The channel never signs anyone in. It asks a [`SessionTokenProvider`] for
//! the current token right before opening a socket (and, optionally, on every
//! heartbeat). `Ok(None)` means "no authenticated session".

use crate::types::Result;
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::RwLock;

pub trait SessionTokenProvider: Send + Sync + 'static {
    /// Current session token, `None` when nobody is signed in
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>>;
}

impl<T: SessionTokenProvider + ?Sized> SessionTokenProvider for Arc<T> {
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        (**self).session_token()
    }
}

/// A fixed token, or a fixed absence of one.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn none() -> Self {
        Self { token: None }
    }
}

impl SessionTokenProvider for StaticTokenProvider {
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        future::ready(Ok(self.token.clone())).boxed()
    }
}

/// Token slot updated by the application on sign-in, refresh and sign-out.
#[derive(Debug, Clone, Default)]
pub struct SharedTokenProvider {
    token: Arc<RwLock<Option<String>>>,
}

impl SharedTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

impl SessionTokenProvider for SharedTokenProvider {
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        async move { Ok(self.token.read().await.clone()) }.boxed()
    }
}
