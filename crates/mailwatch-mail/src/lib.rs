//! Mailwatch Mail: IMAP and POP3 adapters for the `MailSource` contract.
//!
//! This crate provides:
//! - **imap**: Read-only IMAP client (`EXAMINE` + `UID SEARCH` + `BODY.PEEK[]`)
//! - **pop3**: POP3 client scanning newest-first with `TOP`
//! - **parse**: MIME decoding into `FetchedMessage`

pub mod imap;
pub mod parse;
pub mod pop3;
mod transport;

use std::sync::Arc;

use mailwatch_core::config::{EffectiveConfig, MailProtocol};
use mailwatch_core::source::MailSource;

pub use imap::ImapSource;
pub use parse::parse_message;
pub use pop3::Pop3Source;

/// Pick the adapter for a mailbox's protocol.
pub fn connect_source(config: &EffectiveConfig) -> Arc<dyn MailSource> {
    match config.protocol {
        MailProtocol::Imap => Arc::new(ImapSource),
        MailProtocol::Pop3 => Arc::new(Pop3Source),
    }
}
