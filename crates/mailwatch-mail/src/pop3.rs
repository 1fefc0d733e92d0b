//! POP3 adapter.
//!
//! POP3 has no server-side search, so `list_since` walks the maildrop from
//! the newest message down using `TOP n 0` (headers only) and stops at the
//! first message dated before the cutoff. The sender filter is applied to
//! the `From` header on the client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailparse::MailHeaderMap;
use tracing::{debug, trace};

use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::source::{FetchedMessage, MailSession, MailSource, MessageRef};

use crate::parse::{parse_date, parse_message, sender_matches};
use crate::transport::Connection;

/// Opens POP3 sessions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pop3Source;

#[async_trait]
impl MailSource for Pop3Source {
    fn protocol(&self) -> &str {
        "POP3"
    }

    async fn connect(
        &self,
        host: &str,
        port: u16,
        use_tls: bool,
    ) -> Result<Box<dyn MailSession>> {
        let client = Pop3Client::connect(host, port, use_tls).await?;
        Ok(Box::new(client))
    }
}

struct Pop3Client {
    conn: Connection,
}

impl Pop3Client {
    async fn connect(host: &str, port: u16, use_tls: bool) -> Result<Self> {
        let mut conn = Connection::open(host, port, use_tls).await?;

        let greeting = conn.read_line().await?;
        if !greeting.starts_with("+OK") {
            return Err(MonitorError::Protocol(format!(
                "unexpected POP3 greeting: {greeting}"
            )));
        }
        debug!(host, port, "POP3 connected");

        Ok(Self { conn })
    }

    /// Send a command and return its single-line `+OK` reply.
    async fn command(&mut self, cmd: &str) -> Result<String> {
        self.conn.write_line(cmd).await?;
        let reply = self.conn.read_line().await?;
        if !reply.starts_with("+OK") {
            let verb = cmd.split_whitespace().next().unwrap_or(cmd);
            return Err(MonitorError::Protocol(format!("POP3 {verb} failed: {reply}")));
        }
        Ok(reply)
    }

    /// Read a dot-terminated multi-line body, undoing dot-stuffing.
    async fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let line = self.conn.read_line_bytes().await?;
            if line == b"." {
                return Ok(data);
            }
            let line = line.strip_prefix(b".").filter(|l| l.starts_with(b".")).unwrap_or(&line[..]);
            data.extend_from_slice(line);
            data.extend_from_slice(b"\r\n");
        }
    }

    /// Number of messages in the maildrop.
    async fn stat(&mut self) -> Result<u32> {
        let reply = self.command("STAT").await?;
        reply
            .split_whitespace()
            .nth(1)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| MonitorError::Protocol(format!("malformed STAT reply: {reply}")))
    }

    /// Headers of message `n`.
    async fn top(&mut self, n: u32) -> Result<Vec<u8>> {
        self.command(&format!("TOP {n} 0")).await?;
        self.read_multiline().await
    }
}

#[async_trait]
impl MailSession for Pop3Client {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        self.command(&format!("USER {username}"))
            .await
            .map_err(|e| MonitorError::Auth(e.to_string()))?;
        self.command(&format!("PASS {password}"))
            .await
            .map_err(|_| MonitorError::Auth("POP3 PASS rejected".into()))?;
        Ok(())
    }

    async fn list_since(
        &mut self,
        since: DateTime<Utc>,
        senders: &[String],
    ) -> Result<Vec<MessageRef>> {
        let count = self.stat().await?;
        debug!(messages = count, "POP3 maildrop size");

        let mut refs = Vec::new();
        for n in (1..=count).rev() {
            let raw = self.top(n).await?;
            let (headers, _) = mailparse::parse_headers(&raw)
                .map_err(|e| MonitorError::Protocol(format!("malformed headers for {n}: {e}")))?;

            let Some(date) = headers.get_first_value("Date").and_then(|d| parse_date(&d)) else {
                trace!(message = n, "no usable Date header, skipping");
                continue;
            };
            if date < since {
                trace!(message = n, "reached messages older than cutoff");
                break;
            }

            let from = headers.get_first_value("From").unwrap_or_default();
            if !sender_matches(&from, senders) {
                trace!(message = n, from = %from, "sender not expected, skipping");
                continue;
            }
            refs.push(MessageRef::new(n.to_string()));
        }

        // Oldest first, so the last element is the newest.
        refs.reverse();
        Ok(refs)
    }

    async fn fetch(&mut self, message: &MessageRef) -> Result<FetchedMessage> {
        self.command(&format!("RETR {}", message.id)).await?;
        let raw = self.read_multiline().await?;
        parse_message(&raw, Utc::now())
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.command("QUIT").await;
        Ok(())
    }
}
