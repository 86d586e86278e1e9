//! Bearer token lifecycle
//!
//! Sources that hand out expiring bearer tokens go through a
//! [`TokenManager`]: it caches the current token, refreshes it from the
//! token endpoint when the remaining validity drops under a safety margin,
//! and reports fresh state back so the caller can persist it across
//! sessions.

use super::SecureString;
use crate::error::{FetchError, Result};
use crate::http::HttpClient;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

/// Tokens within this margin of expiry are refreshed before use
const REFRESH_MARGIN_HOURS: i64 = 12;

/// A bearer token with its expiry instant
#[derive(Clone)]
pub struct TokenState {
    pub access_token: SecureString,
    pub expires_at: DateTime<Utc>,
}

impl TokenState {
    pub fn new(access_token: impl Into<SecureString>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::hours(REFRESH_MARGIN_HOURS)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Validity in seconds from now
    expires_in: i64,
}

pub struct TokenManager {
    token_url: Url,
    client_id: String,
    state: Mutex<Option<TokenState>>,
}

impl TokenManager {
    pub fn new(token_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            token_url,
            client_id: client_id.into(),
            state: Mutex::new(None),
        }
    }

    /// Seed the manager with a token persisted from an earlier session.
    pub async fn restore(&self, token: impl Into<SecureString>, expires_at: DateTime<Utc>) {
        *self.state.lock().await = Some(TokenState::new(token, expires_at));
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current bearer token, refreshing first when it is missing or close
    /// to expiry.
    ///
    /// Returns the token plus the new state when a refresh happened, so the
    /// caller can write it back to configuration.
    pub async fn bearer(&self, http: &dyn HttpClient) -> Result<(String, Option<TokenState>)> {
        let mut state = self.state.lock().await;

        if let Some(current) = state.as_ref() {
            if current.is_fresh(Utc::now()) {
                return Ok((current.access_token.expose_secret(), None));
            }
            debug!("bearer token expires at {}, refreshing", current.expires_at);
        }

        let fresh = self.request_token(http).await?;
        let token = fresh.access_token.expose_secret();
        *state = Some(fresh.clone());
        Ok((token, Some(fresh)))
    }

    /// Drop the cached token so the next use forces a refresh.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    async fn request_token(&self, http: &dyn HttpClient) -> Result<TokenState> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("grant_type", "client_credentials");

        let response = http.post(&url, &[], String::new()).await?;
        response.error_for_status("token endpoint")?;

        let parsed: TokenResponse = response.json()?;
        if parsed.access_token.is_empty() {
            return Err(FetchError::auth("token endpoint returned an empty token"));
        }

        let expires_at = Utc::now() + Duration::seconds(parsed.expires_in);
        info!("refreshed bearer token, valid until {expires_at}");
        Ok(TokenState::new(parsed.access_token, expires_at))
    }
}
