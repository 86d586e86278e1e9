//! Library catalog (OPAC) fetcher for book collections
//!
//! Speaks the line-oriented catalog protocol over a [`LineConnector`].
//! A search logs in, runs FIND to learn the hit count, then retrieves
//! result windows with SHOW; the session stays open so continue_search
//! can page through the same result set. A rejected login clears the
//! cached credentials and retries once with freshly prompted ones.

use crate::config::OpacConfig;
use crate::credentials::{BasicAuthManager, CredentialPrompt};
use crate::entry::Entry;
use crate::error::{FetchError, Result};
use crate::event::EventSender;
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::lineproto::{LineConnector, OpacConnection, Record, TcpConnector};
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const MIN_INTERVAL: Duration = Duration::from_millis(500);

pub struct OpacFetcher {
    connector: Arc<dyn LineConnector>,
    auth: BasicAuthManager,
    state: SearchState,
    limiter: RateLimiter,
    max_results: usize,
    session: Mutex<Option<OpacConnection>>,
}

impl OpacFetcher {
    pub const SOURCE: &'static str = "Library Catalog";

    pub fn new(
        connector: Arc<dyn LineConnector>,
        prompt: Box<dyn CredentialPrompt>,
        sender: EventSender,
        max_results: usize,
    ) -> Self {
        Self {
            connector,
            auth: BasicAuthManager::new(Self::SOURCE, prompt),
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            max_results,
            session: Mutex::new(None),
        }
    }

    /// Build a fetcher talking TCP to the configured catalog host.
    pub fn from_config(
        config: &OpacConfig,
        prompt: Box<dyn CredentialPrompt>,
        sender: EventSender,
        max_results: usize,
    ) -> Result<Self> {
        if config.host.is_empty() {
            return Err(FetchError::config("catalog host is not configured"));
        }
        let connector = Arc::new(TcpConnector::new(config.host.clone(), config.port));
        Ok(Self::new(connector, prompt, sender, max_results))
    }

    /// Open and authenticate a session, re-prompting once after a
    /// rejected login.
    async fn login(&self) -> Result<OpacConnection> {
        for attempt in 0..2 {
            let (user, password) = self.auth.credentials().await?;
            let transport = self.connector.connect().await?;
            match OpacConnection::login(transport, &user, &password.expose_secret()).await {
                Ok(session) => return Ok(session),
                Err(FetchError::Auth(_)) if attempt == 0 => {
                    debug!("catalog rejected login for {user}, prompting again");
                    self.auth.invalidate().await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(FetchError::auth("catalog rejected login twice"))
    }

    async fn run_search(&self, generation: u64, request: &FetchRequest) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut session = self.login().await?;
        let tag = find_tag(request.key());
        let count = session.find(tag, request.value()).await?;
        self.emit_window(generation, &mut session, 1, count).await?;

        *self.session.lock().await = Some(session);
        Ok(())
    }

    async fn run_continue(&self, generation: u64) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or(FetchError::InvalidState("catalog session is gone"))?;
        let offset = self.state.offset() + 1;
        let total = self.state.total().unwrap_or(0);
        self.emit_window(generation, session, offset, total).await
    }

    async fn emit_window(
        &self,
        generation: u64,
        session: &mut OpacConnection,
        offset: u64,
        total: u64,
    ) -> Result<()> {
        if total == 0 {
            self.state.record_page(generation, 0, Some(0));
            self.state.finish_page(generation, false);
            return Ok(());
        }

        let window = self.max_results as u64;
        let records = session.show(offset, window).await?;
        let emitted = records.len() as u64;
        for record in records {
            let entry = entry_from_record(&record);
            let title = entry.field("title").to_string();
            let description = describe(&entry);
            self.state
                .emit_result(generation, HydrationSlot::Hydrated(entry), title, description);
        }

        self.state.record_page(generation, emitted, Some(total));
        let seen = self.state.offset();
        self.state
            .finish_page(generation, emitted > 0 && seen < total);
        Ok(())
    }
}

fn find_tag(key: FetchKey) -> &'static str {
    match key {
        FetchKey::Person => "AU",
        FetchKey::Isbn => "SB",
        FetchKey::Keyword => "KW",
        _ => "TI",
    }
}

fn entry_from_record(record: &Record) -> Entry {
    const TAGS: [(&str, &str); 6] = [
        ("TI", "title"),
        ("AU", "author"),
        ("PU", "publisher"),
        ("YR", "pub_year"),
        ("SB", "isbn"),
        ("SU", "genre"),
    ];

    let mut entry = Entry::new();
    for (tag, field) in TAGS {
        if let Some(value) = record.get(tag) {
            entry.set_field(field, value);
        }
    }
    entry
}

fn describe(entry: &Entry) -> String {
    let author = entry.field("author");
    let year = entry.field("pub_year");
    match (author.is_empty(), year.is_empty()) {
        (false, false) => format!("{author} ({year})"),
        (false, true) => author.to_string(),
        (true, false) => year.to_string(),
        (true, true) => String::new(),
    }
}

#[async_trait]
impl Fetcher for OpacFetcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn can_search(&self, key: FetchKey) -> bool {
        matches!(
            key,
            FetchKey::Title | FetchKey::Person | FetchKey::Isbn | FetchKey::Keyword
        )
    }

    fn can_fetch(&self, kind: CollectionKind) -> bool {
        matches!(kind, CollectionKind::Book | CollectionKind::Comic)
    }

    async fn search(&self, request: FetchRequest) -> Result<()> {
        if !self.can_search(request.key()) {
            return Err(FetchError::InvalidState("unsupported search key"));
        }

        let generation = self.state.begin_search()?;
        // a previous session, if any, is closed with the old result set
        if let Some(old) = self.session.lock().await.take() {
            old.quit().await;
        }
        if let Err(err) = self.run_search(generation, &request).await {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    async fn continue_search(&self) -> Result<()> {
        let generation = self.state.begin_continue()?;
        if let Err(err) = self.run_continue(generation).await {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    fn is_searching(&self) -> bool {
        self.state.is_searching()
    }

    fn has_more_results(&self) -> bool {
        self.state.has_more_results()
    }

    async fn fetch_entry(&self, uid: u64) -> Result<Entry> {
        match self.state.slot(uid)? {
            HydrationSlot::Hydrated(entry) => Ok(entry),
            HydrationSlot::Partial { entry, .. } => Ok(entry),
        }
    }

    fn stop(&self) {
        self.state.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SecureString;
    use crate::event::{EventReceiver, FetchEvent, Severity, channel};
    use crate::curio_test_utils::ScriptedConnector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrompt;

    #[async_trait]
    impl CredentialPrompt for FixedPrompt {
        async fn prompt(&self, _source: &str) -> Result<(String, SecureString)> {
            Ok(("reader".to_string(), SecureString::new("shelf")))
        }
    }

    struct SequencePrompt {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CredentialPrompt for SequencePrompt {
        async fn prompt(&self, _source: &str) -> Result<(String, SecureString)> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((format!("user{n}"), SecureString::new("pw")))
        }
    }

    fn fetcher_with(
        connector: Arc<ScriptedConnector>,
        prompt: Box<dyn CredentialPrompt>,
        max_results: usize,
    ) -> (OpacFetcher, EventReceiver) {
        let (tx, rx) = channel();
        (OpacFetcher::new(connector, prompt, tx, max_results), rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn dune_request() -> FetchRequest {
        FetchRequest::new(CollectionKind::Book, FetchKey::Title, "dune")
    }

    #[tokio::test]
    async fn test_search_logs_in_and_maps_records() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&[
            "220 catalog ready",
            "230 welcome reader",
            "210 2 hits",
            "TI Dune",
            "AU Herbert, Frank",
            "PU Chilton Books",
            "YR 1965",
            "SB 9780441013593",
            "SU Science fiction",
            "",
            "TI Dune Messiah",
            "AU Herbert, Frank",
            "YR 1969",
            ".",
        ]);
        let (fetcher, mut rx) = fetcher_with(connector.clone(), Box::new(FixedPrompt), 20);

        fetcher.search(dune_request()).await.unwrap();

        let events = drain(&mut rx);
        let results: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::ResultFound(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Dune");
        assert_eq!(results[0].description, "Herbert, Frank (1965)");
        assert!(matches!(events.last(), Some(FetchEvent::Done { .. })));

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("author"), "Herbert, Frank");
        assert_eq!(entry.field("publisher"), "Chilton Books");
        assert_eq!(entry.field("isbn"), "9780441013593");
        assert_eq!(entry.field("genre"), "Science fiction");

        let sent = connector.sent_lines();
        assert_eq!(sent[0], "LOGIN reader shelf");
        assert_eq!(sent[1], "FIND TI dune");
        assert_eq!(sent[2], "SHOW 1 20");
    }

    #[tokio::test]
    async fn test_rejected_login_reprompts_once() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&["220 catalog ready", "530 invalid credentials"]);
        connector.add_session(&[
            "220 catalog ready",
            "230 welcome",
            "210 1 hits",
            "TI Dune",
            ".",
        ]);
        let calls = Arc::new(AtomicUsize::new(0));
        let (fetcher, mut rx) = fetcher_with(
            connector.clone(),
            Box::new(SequencePrompt {
                calls: calls.clone(),
            }),
            20,
        );

        fetcher.search(dune_request()).await.unwrap();

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, FetchEvent::ResultFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(connector
            .sent_lines()
            .iter()
            .any(|line| line == "LOGIN user1 pw"));
    }

    #[tokio::test]
    async fn test_second_rejection_surfaces_auth_error() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&["220 catalog ready", "530 invalid credentials"]);
        connector.add_session(&["220 catalog ready", "530 invalid credentials"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let (fetcher, mut rx) = fetcher_with(
            connector,
            Box::new(SequencePrompt { calls }),
            20,
        );

        fetcher.search(dune_request()).await.unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            &events[0],
            FetchEvent::Message {
                severity: Severity::Error,
                ..
            }
        ));
        assert!(matches!(events[1], FetchEvent::Done { .. }));
    }

    #[tokio::test]
    async fn test_pagination_reuses_the_session() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&[
            "220 catalog ready",
            "230 welcome",
            "210 3 hits",
            "TI Dune",
            "",
            "TI Dune Messiah",
            ".",
            "TI Children of Dune",
            ".",
        ]);
        let (fetcher, mut rx) = fetcher_with(connector.clone(), Box::new(FixedPrompt), 2);

        fetcher.search(dune_request()).await.unwrap();
        let _ = drain(&mut rx);
        assert!(fetcher.has_more_results());

        fetcher.continue_search().await.unwrap();
        let events = drain(&mut rx);
        let results: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::ResultFound(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uid, 3);
        assert_eq!(results[0].title, "Children of Dune");
        assert!(!fetcher.has_more_results());

        // one login, one FIND, two SHOW windows
        let sent = connector.sent_lines();
        assert_eq!(
            sent.iter().filter(|l| l.starts_with("LOGIN")).count(),
            1
        );
        assert_eq!(sent[2], "SHOW 1 2");
        assert_eq!(sent[3], "SHOW 3 2");
    }

    #[tokio::test]
    async fn test_new_search_quits_the_previous_session() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&[
            "220 catalog ready",
            "230 welcome",
            "210 1 hits",
            "TI Dune",
            ".",
            "221 goodbye",
        ]);
        connector.add_session(&[
            "220 catalog ready",
            "230 welcome",
            "210 1 hits",
            "TI Hyperion",
            ".",
        ]);
        let (fetcher, mut rx) = fetcher_with(connector.clone(), Box::new(FixedPrompt), 20);

        fetcher.search(dune_request()).await.unwrap();
        let _ = drain(&mut rx);
        fetcher
            .search(FetchRequest::new(
                CollectionKind::Book,
                FetchKey::Title,
                "hyperion",
            ))
            .await
            .unwrap();
        let _ = drain(&mut rx);

        let sent = connector.sent_lines();
        assert!(sent.iter().any(|line| line == "QUIT"));
        assert_eq!(
            sent.iter().filter(|l| l.starts_with("LOGIN")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_zero_hits_finishes_cleanly() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.add_session(&["220 catalog ready", "230 welcome", "210 0 hits"]);
        let (fetcher, mut rx) = fetcher_with(connector, Box::new(FixedPrompt), 20);

        fetcher.search(dune_request()).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FetchEvent::Done { .. }));
        assert!(!fetcher.has_more_results());
    }

    #[tokio::test]
    async fn test_unconfigured_host_is_a_config_error() {
        let (tx, _rx) = channel();
        let result = OpacFetcher::from_config(
            &OpacConfig::default(),
            Box::new(FixedPrompt),
            tx,
            20,
        );
        assert!(matches!(result, Err(FetchError::Config(_))));
    }
}
