//! Mail source contract: what the monitor needs from a mail server.
//!
//! A [`MailSource`] knows how to open a [`MailSession`] for one protocol.
//! The session is then driven through authenticate → list → fetch → close.
//! Adapters live in `mailwatch-mail`; tests use scripted fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Opaque handle to a message, as returned by [`MailSession::list_since`].
///
/// The id is whatever the server uses to address a message (an IMAP UID, a
/// POP3 message number).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub id: String,
}

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A fetched and decoded message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedMessage {
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    pub received_at: DateTime<Utc>,
    pub from_address: String,
}

impl FetchedMessage {
    /// Body used for pattern checks: plain text, else the HTML source.
    pub fn body(&self) -> &str {
        self.text_body
            .as_deref()
            .or(self.html_body.as_deref())
            .unwrap_or("")
    }
}

/// Opens sessions against one mail server.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Protocol name used in logs (e.g. "IMAP").
    fn protocol(&self) -> &str;

    /// Open a connection, optionally over implicit TLS.
    async fn connect(&self, host: &str, port: u16, use_tls: bool)
        -> Result<Box<dyn MailSession>>;
}

/// An open connection to a mail server.
#[async_trait]
pub trait MailSession: Send {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()>;

    /// Messages delivered since `since`, in server order.
    ///
    /// When `senders` is non-empty only messages whose sender contains any
    /// of the given addresses are returned. The last element is treated as
    /// the newest.
    async fn list_since(
        &mut self,
        since: DateTime<Utc>,
        senders: &[String],
    ) -> Result<Vec<MessageRef>>;

    async fn fetch(&mut self, message: &MessageRef) -> Result<FetchedMessage>;

    /// Best-effort logout.
    async fn close(&mut self) -> Result<()>;
}
