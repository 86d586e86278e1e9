//! HTTP transport seam
//!
//! Fetchers talk to remote services through the [`HttpClient`] trait rather
//! than a concrete client, so tests can substitute scripted responses. The
//! production implementation wraps a shared [`reqwest::Client`].

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// User agent sent on every outgoing request
pub const USER_AGENT: &str = concat!("curio/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed HTTP exchange.
///
/// Bodies are buffered as text; every service this library talks to returns
/// JSON, XML, or HTML small enough to hold in memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Map a non-success status to the shared error taxonomy.
    pub fn error_for_status(&self, context: &str) -> Result<()> {
        match FetchError::from_status(self.status, context) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Abstract HTTP transport used by every web-based fetcher
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse>;

    async fn post(
        &self,
        url: &Url,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse>;
}

/// Production transport backed by reqwest
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut request = self.inner.get(url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn post(
        &self,
        url: &Url,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse> {
        let mut request = self.inner.post(url.as_str()).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        assert!(HttpResponse::new(200, "ok").error_for_status("x").is_ok());
        assert!(matches!(
            HttpResponse::new(401, "").error_for_status("x"),
            Err(FetchError::Auth(_))
        ));
        assert!(matches!(
            HttpResponse::new(429, "").error_for_status("x"),
            Err(FetchError::RateLimited(_))
        ));
        assert!(matches!(
            HttpResponse::new(500, "").error_for_status("x"),
            Err(FetchError::Transport(_))
        ));
    }

    #[test]
    fn test_json_parse_failure_is_payload_error() {
        let response = HttpResponse::new(200, "not json");
        let result: Result<serde_json::Value> = response.json();
        assert!(matches!(result, Err(FetchError::Payload(_))));
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("curio/"));
    }
}
