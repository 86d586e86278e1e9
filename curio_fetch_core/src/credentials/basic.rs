//! Interactive username/password authentication
//!
//! Library catalogs gate their search interface behind an account. The
//! credentials are gathered through the [`CredentialPrompt`] seam exactly
//! once per session and cached; a rejected login clears the cache so the
//! next attempt prompts again.

use super::SecureString;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::Mutex;

/// Seam for asking the user for a username and password.
///
/// The CLI implements this with an interactive prompt; tests script it.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn prompt(&self, source: &str) -> Result<(String, SecureString)>;
}

/// Cached username/password pair for one source
pub struct BasicAuthManager {
    source: String,
    prompt: Box<dyn CredentialPrompt>,
    cached: Mutex<Option<(String, SecureString)>>,
}

impl BasicAuthManager {
    pub fn new(source: impl Into<String>, prompt: Box<dyn CredentialPrompt>) -> Self {
        Self {
            source: source.into(),
            prompt,
            cached: Mutex::new(None),
        }
    }

    /// Username and password, prompting on first use.
    pub async fn credentials(&self) -> Result<(String, SecureString)> {
        let mut cached = self.cached.lock().await;
        if let Some((user, pass)) = cached.as_ref() {
            return Ok((user.clone(), pass.clone()));
        }

        let (user, pass) = self.prompt.prompt(&self.source).await?;
        if user.is_empty() {
            return Err(FetchError::auth(format!(
                "{} login cancelled, no username given",
                self.source
            )));
        }

        *cached = Some((user.clone(), pass.clone()));
        Ok((user, pass))
    }

    /// `Authorization: Basic` header value for the cached pair.
    pub async fn basic_header(&self) -> Result<String> {
        let (user, pass) = self.credentials().await?;
        let pair = format!("{user}:{}", pass.expose_secret());
        Ok(format!("Basic {}", BASE64.encode(pair)))
    }

    /// Forget the cached pair after a rejected login.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
