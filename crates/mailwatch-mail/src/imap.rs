//! IMAP adapter.
//!
//! A minimal async IMAP client supporting only the commands needed to
//! inspect today's inbox: LOGIN, EXAMINE, UID SEARCH, UID FETCH, LOGOUT.
//! The inbox is opened read-only and bodies are fetched with `BODY.PEEK[]`
//! so that checking never marks anything as seen.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tracing::debug;

use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::source::{FetchedMessage, MailSession, MailSource, MessageRef};

use crate::parse::parse_message;
use crate::transport::Connection;

/// Largest message literal accepted from the server.
const MAX_LITERAL_BYTES: usize = 50 * 1024 * 1024;

/// Opens IMAP sessions.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImapSource;

#[async_trait]
impl MailSource for ImapSource {
    fn protocol(&self) -> &str {
        "IMAP"
    }

    async fn connect(
        &self,
        host: &str,
        port: u16,
        use_tls: bool,
    ) -> Result<Box<dyn MailSession>> {
        let client = ImapClient::connect(host, port, use_tls).await?;
        Ok(Box::new(client))
    }
}

struct ImapClient {
    conn: Connection,
    tag_counter: u32,
    selected: bool,
}

impl ImapClient {
    async fn connect(host: &str, port: u16, use_tls: bool) -> Result<Self> {
        let mut conn = Connection::open(host, port, use_tls).await?;

        // Server greeting, e.g. "* OK IMAP server ready"
        let greeting = conn.read_line().await?;
        if !greeting.to_uppercase().starts_with("* OK") {
            return Err(MonitorError::Protocol(format!(
                "unexpected IMAP greeting: {greeting}"
            )));
        }
        debug!(host, port, greeting = %greeting, "IMAP connected");

        Ok(Self {
            conn,
            tag_counter: 0,
            selected: false,
        })
    }

    /// Send a tagged command. Returns the tag.
    async fn send_command(&mut self, cmd: &str) -> Result<String> {
        self.tag_counter += 1;
        let tag = format!("A{:04}", self.tag_counter);
        self.conn.write_line(&format!("{tag} {cmd}")).await?;
        Ok(tag)
    }

    /// Read responses until the tagged completion line.
    /// Returns (untagged_lines, tagged_status_line).
    async fn read_response(&mut self, tag: &str) -> Result<(Vec<String>, String)> {
        let mut untagged = Vec::new();
        loop {
            let line = self.conn.read_line().await?;
            if is_tagged(&line, tag) {
                return Ok((untagged, line));
            }
            untagged.push(line);
        }
    }

    /// Run a command that only needs a tagged OK.
    async fn simple_command(&mut self, cmd: &str, name: &str) -> Result<Vec<String>> {
        let tag = self.send_command(cmd).await?;
        let (lines, status) = self.read_response(&tag).await?;
        if !is_ok(&status, &tag) {
            return Err(MonitorError::Protocol(format!("IMAP {name} failed: {status}")));
        }
        Ok(lines)
    }

    /// EXAMINE INBOX (read-only SELECT), once per session.
    async fn examine_inbox(&mut self) -> Result<()> {
        if self.selected {
            return Ok(());
        }
        let lines = self.simple_command("EXAMINE INBOX", "EXAMINE").await?;
        let exists = lines
            .iter()
            .find_map(|l| l.strip_prefix("* ").and_then(|r| r.strip_suffix(" EXISTS")))
            .unwrap_or("?");
        debug!(messages = exists, "IMAP inbox opened");
        self.selected = true;
        Ok(())
    }
}

#[async_trait]
impl MailSession for ImapClient {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let cmd = format!("LOGIN {} {}", quote(username), quote(password));
        let tag = self.send_command(&cmd).await?;
        let (_, status) = self.read_response(&tag).await?;
        if !is_ok(&status, &tag) {
            return Err(MonitorError::Auth(format!("IMAP LOGIN rejected: {status}")));
        }
        Ok(())
    }

    async fn list_since(
        &mut self,
        since: DateTime<Utc>,
        senders: &[String],
    ) -> Result<Vec<MessageRef>> {
        self.examine_inbox().await?;

        let cmd = search_command(since, senders);
        let lines = self.simple_command(&cmd, "SEARCH").await?;

        let mut refs = Vec::new();
        for line in &lines {
            if line.to_uppercase().starts_with("* SEARCH") {
                refs.extend(
                    line.split_whitespace()
                        .skip(2) // skip "* SEARCH"
                        .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
                        .map(MessageRef::new),
                );
            }
        }
        debug!(count = refs.len(), "IMAP search complete");
        Ok(refs)
    }

    async fn fetch(&mut self, message: &MessageRef) -> Result<FetchedMessage> {
        let cmd = format!("UID FETCH {} (BODY.PEEK[])", message.id);
        let tag = self.send_command(&cmd).await?;

        let mut raw: Option<Vec<u8>> = None;
        loop {
            let line = self.conn.read_line().await?;

            if is_tagged(&line, &tag) {
                if !is_ok(&line, &tag) {
                    return Err(MonitorError::Protocol(format!("IMAP FETCH failed: {line}")));
                }
                break;
            }

            // Untagged FETCH response: * N FETCH (UID nnn BODY[] {size}
            if line.starts_with("* ") && line.to_uppercase().contains("FETCH") {
                if let Some(size) = literal_size(&line) {
                    let size = usize::try_from(size)
                        .ok()
                        .filter(|n| *n <= MAX_LITERAL_BYTES)
                        .ok_or_else(|| {
                            MonitorError::Protocol(format!(
                                "IMAP literal of {size} bytes exceeds {MAX_LITERAL_BYTES}"
                            ))
                        })?;
                    raw = Some(self.conn.read_exact(size).await?);
                    // Closing ")" after the literal
                    let _closing = self.conn.read_line().await?;
                }
            }
        }

        let raw = raw.ok_or_else(|| {
            MonitorError::Protocol(format!("IMAP FETCH returned no body for UID {}", message.id))
        })?;
        parse_message(&raw, Utc::now())
    }

    async fn close(&mut self) -> Result<()> {
        let tag = self.send_command("LOGOUT").await?;
        // Server may send * BYE before the tagged OK
        let _ = self.read_response(&tag).await;
        Ok(())
    }
}

/// Build `UID SEARCH SINCE <date> [sender criteria]`.
///
/// IMAP dates have no time or zone, so the local calendar day of `since`
/// is used. Several senders are combined with nested `OR`.
fn search_command(since: DateTime<Utc>, senders: &[String]) -> String {
    let date = since.with_timezone(&Local).format("%-d-%b-%Y");
    let mut cmd = format!("UID SEARCH SINCE {date}");
    if let Some(criteria) = sender_criteria(senders) {
        cmd.push(' ');
        cmd.push_str(&criteria);
    }
    cmd
}

fn sender_criteria(senders: &[String]) -> Option<String> {
    match senders {
        [] => None,
        [only] => Some(format!("FROM {}", quote(only))),
        [first, rest @ ..] => {
            let rest = sender_criteria(rest)?;
            Some(format!("OR FROM {} {}", quote(first), rest))
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn is_tagged(line: &str, tag: &str) -> bool {
    line.strip_prefix(tag).is_some_and(|r| r.starts_with(' '))
}

fn is_ok(status_line: &str, tag: &str) -> bool {
    status_line
        .strip_prefix(tag)
        .and_then(|r| r.split_whitespace().next())
        .is_some_and(|s| s.eq_ignore_ascii_case("OK"))
}

/// Size of a trailing `{N}` literal marker.
fn literal_size(line: &str) -> Option<u64> {
    let rest = line.strip_suffix('}')?;
    let start = rest.rfind('{')?;
    rest[start + 1..].parse().ok()
}
