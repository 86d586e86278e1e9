//! Scripted HTTP client
//!
//! Responses are matched by URL substring rules first, then drawn from a
//! FIFO queue; anything unmatched gets a 404. Every request is recorded so
//! tests can assert on what a fetcher actually sent.

use async_trait::async_trait;
use curio_fetch_core::error::{FetchError, Result};
use curio_fetch_core::http::{HttpClient, HttpResponse};
use std::collections::VecDeque;
use std::sync::Mutex;
use url::Url;

#[derive(Clone)]
enum Scripted {
    Reply { status: u16, body: String },
    TransportError(String),
}

/// One request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Default)]
pub struct MockHttpClient {
    rules: Mutex<Vec<(String, Scripted)>>,
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with the given body whenever the URL contains `url_part`.
    /// Rules are reusable and matched in registration order.
    pub fn respond_when(&self, url_part: &str, status: u16, body: &str) {
        self.rules.lock().unwrap().push((
            url_part.to_string(),
            Scripted::Reply {
                status,
                body: body.to_string(),
            },
        ));
    }

    /// Fail with a transport error whenever the URL contains `url_part`.
    pub fn fail_when(&self, url_part: &str, message: &str) {
        self.rules.lock().unwrap().push((
            url_part.to_string(),
            Scripted::TransportError(message.to_string()),
        ));
    }

    /// Queue a one-shot response used when no rule matches.
    pub fn push_response(&self, status: u16, body: &str) {
        self.queue.lock().unwrap().push_back(Scripted::Reply {
            status,
            body: body.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn handle(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.to_vec(),
            body,
        });

        let url_string = url.to_string();
        let matched = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(part, _)| url_string.contains(part.as_str()))
            .map(|(_, scripted)| scripted.clone())
            .or_else(|| self.queue.lock().unwrap().pop_front());

        match matched {
            Some(Scripted::Reply { status, body }) => Ok(HttpResponse::new(status, body)),
            Some(Scripted::TransportError(message)) => Err(FetchError::transport(message)),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse> {
        self.handle("GET", url, headers, String::new())
    }

    async fn post(
        &self,
        url: &Url,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse> {
        self.handle("POST", url, headers, body)
    }
}
