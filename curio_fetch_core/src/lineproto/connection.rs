//! Catalog session over a line transport

use super::codec::{Record, StatusLine, parse_records, parse_status};
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use log::{debug, trace};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// One line-oriented duplex connection
#[async_trait]
pub trait LineTransport: Send {
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Next line with the terminator stripped.
    async fn read_line(&mut self) -> Result<String>;
}

/// Opens fresh transports, one per catalog session
#[async_trait]
pub trait LineConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LineTransport>>;
}

/// TCP transport for real catalog servers
pub struct TcpLineTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl LineTransport for TcpLineTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("opac >> {line}");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(FetchError::transport("catalog closed the connection"));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!("opac << {line}");
        Ok(line)
    }
}

pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl LineConnector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn LineTransport>> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Box::new(TcpLineTransport {
            reader: BufReader::new(read_half),
            writer: write_half,
        }))
    }
}

/// An authenticated catalog session
pub struct OpacConnection {
    transport: Box<dyn LineTransport>,
}

impl OpacConnection {
    /// Consume the greeting and log in.
    ///
    /// A `530` reply maps to [`FetchError::Auth`] so the caller can
    /// re-prompt for credentials.
    pub async fn login(
        mut transport: Box<dyn LineTransport>,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let greeting = parse_status(&transport.read_line().await?)?;
        if !greeting.is_ok() {
            return Err(FetchError::transport(format!(
                "catalog refused session: {} {}",
                greeting.code, greeting.text
            )));
        }

        transport
            .send_line(&format!("LOGIN {user} {password}"))
            .await?;
        let reply = parse_status(&transport.read_line().await?)?;
        if reply.is_auth_failure() {
            return Err(FetchError::auth(format!(
                "catalog rejected login for {user}"
            )));
        }
        if !reply.is_ok() {
            return Err(FetchError::transport(format!(
                "unexpected LOGIN reply: {} {}",
                reply.code, reply.text
            )));
        }

        debug!("catalog session established for {user}");
        Ok(Self { transport })
    }

    /// Run a search, returning the server-reported hit count.
    pub async fn find(&mut self, tag: &str, value: &str) -> Result<u64> {
        self.transport
            .send_line(&format!("FIND {tag} {value}"))
            .await?;
        let reply = self.expect_ok("FIND").await?;

        reply
            .text
            .split_whitespace()
            .next()
            .and_then(|word| word.parse().ok())
            .ok_or_else(|| {
                FetchError::payload(format!("FIND reply carries no hit count: {}", reply.text))
            })
    }

    /// Retrieve a window of the current result set.
    pub async fn show(&mut self, offset: u64, count: u64) -> Result<Vec<Record>> {
        self.transport
            .send_line(&format!("SHOW {offset} {count}"))
            .await?;

        let mut lines = Vec::new();
        loop {
            let line = self.transport.read_line().await?;
            if line == "." {
                break;
            }
            lines.push(line);
        }
        Ok(parse_records(&lines))
    }

    /// End the session politely. Errors are ignored; the socket is going
    /// away either way.
    pub async fn quit(mut self) {
        let _ = self.transport.send_line("QUIT").await;
        let _ = self.transport.read_line().await;
    }

    async fn expect_ok(&mut self, command: &str) -> Result<StatusLine> {
        let reply = parse_status(&self.transport.read_line().await?)?;
        if !reply.is_ok() {
            return Err(FetchError::transport(format!(
                "{command} failed: {} {}",
                reply.code, reply.text
            )));
        }
        Ok(reply)
    }
}
