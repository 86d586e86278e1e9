//! Scripted line-protocol transport
//!
//! A scripted session serves a fixed sequence of server lines, one per
//! `read_line` call, and records everything the client sends. The catalog
//! protocol is strictly request/response, so a linear script is enough.

use async_trait::async_trait;
use curio_fetch_core::error::{FetchError, Result};
use curio_fetch_core::lineproto::{LineConnector, LineTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub struct ScriptedTransport {
    script: VecDeque<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            script: lines.iter().map(|s| s.to_string()).collect(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        self.script
            .pop_front()
            .ok_or_else(|| FetchError::transport("scripted session exhausted"))
    }
}

/// Hands out one scripted session per `connect` call
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<String>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, lines: &[&str]) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(lines.iter().map(|s| s.to_string()).collect());
    }

    /// Every line sent by the client across all sessions, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LineConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn LineTransport>> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FetchError::transport("no scripted session available"))?;

        Ok(Box::new(ScriptedTransport {
            script: script.into(),
            sent: Arc::clone(&self.sent),
        }))
    }
}
