use crate::auth::SessionTokenProvider;
use crate::types::{RealtimeError, Result, TOKEN_REFRESH_MARGIN_SECS};
use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + Duration::from_secs(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Default)]
struct SessionSlot {
    refresh_token: Option<String>,
    cached: Option<CachedToken>,
}

/// Exchanges a refresh token for access tokens at the auth service.
///
/// Talks to a GoTrue-style `POST {auth_url}/token?grant_type=refresh_token`
/// endpoint and caches the access token until shortly before it expires.
/// A 400/401 answer means the session was revoked: the refresh token is
/// forgotten and every later call reports `Ok(None)`.
pub struct RefreshingSessionProvider {
    auth_url: Url,
    api_key: String,
    http: reqwest::Client,
    session: Mutex<SessionSlot>,
}

impl RefreshingSessionProvider {
    pub fn new(
        auth_url: &str,
        api_key: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self> {
        let auth_url = Url::parse(auth_url)?;
        Ok(Self {
            auth_url,
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            session: Mutex::new(SessionSlot {
                refresh_token: Some(refresh_token.into()),
                cached: None,
            }),
        })
    }

    /// Seed the cache with an access token the application already holds
    pub async fn with_access_token(
        self,
        access_token: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        self.session.lock().await.cached = Some(CachedToken {
            access_token: access_token.into(),
            expires_at: Instant::now() + expires_in,
        });
        self
    }

    /// Drop the cached access token and the refresh token (sign-out)
    pub async fn sign_out(&self) {
        let mut session = self.session.lock().await;
        session.refresh_token = None;
        session.cached = None;
    }

    fn token_endpoint(&self) -> Result<Url> {
        let mut url = self.auth_url.clone();
        url.path_segments_mut()
            .map_err(|_| RealtimeError::InvalidConfig("auth URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("token");
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        Ok(url)
    }

    async fn refresh(&self, session: &mut SessionSlot) -> Result<Option<String>> {
        let Some(refresh_token) = session.refresh_token.clone() else {
            return Ok(None);
        };

        let url = self.token_endpoint()?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| RealtimeError::Auth(format!("token refresh failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Refresh token rejected with status {}, session ended", status);
            session.refresh_token = None;
            session.cached = None;
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RealtimeError::Auth(format!(
                "token refresh failed with status: {}",
                status
            )));
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!("Refreshed access token, expires in {}s", body.expires_in);

        session.refresh_token = Some(body.refresh_token);
        session.cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        });
        Ok(Some(body.access_token))
    }
}

impl SessionTokenProvider for RefreshingSessionProvider {
    fn session_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        async move {
            let mut session = self.session.lock().await;
            if let Some(cached) = &session.cached
                && cached.is_fresh(Instant::now())
            {
                return Ok(Some(cached.access_token.clone()));
            }
            self.refresh(&mut session).await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_endpoint() {
        let provider =
            RefreshingSessionProvider::new("https://auth.example.com/auth/v1/", "anon", "r1")
                .unwrap();
        assert_eq!(
            provider.token_endpoint().unwrap().as_str(),
            "https://auth.example.com/auth/v1/token?grant_type=refresh_token"
        );
    }

    #[test]
    fn test_cached_token_freshness_margin() {
        let now = Instant::now();
        let almost_expired = CachedToken {
            access_token: "a".to_string(),
            expires_at: now + Duration::from_secs(TOKEN_REFRESH_MARGIN_SECS - 1),
        };
        assert!(!almost_expired.is_fresh(now));

        let fresh = CachedToken {
            access_token: "a".to_string(),
            expires_at: now + Duration::from_secs(3600),
        };
        assert!(fresh.is_fresh(now));
    }

    #[tokio::test]
    async fn test_cached_access_token_is_served_without_refresh() {
        let provider =
            RefreshingSessionProvider::new("http://127.0.0.1:9/auth/v1", "anon", "r1")
                .unwrap()
                .with_access_token("cached-jwt", Duration::from_secs(3600))
                .await;
        assert_eq!(
            provider.session_token().await.unwrap().as_deref(),
            Some("cached-jwt")
        );
    }

    #[tokio::test]
    async fn test_signed_out_provider_reports_no_session() {
        let provider =
            RefreshingSessionProvider::new("http://127.0.0.1:9/auth/v1", "anon", "r1").unwrap();
        provider.sign_out().await;
        assert_eq!(provider.session_token().await.unwrap(), None);
    }
}
