//! Mailwatch Core: shared building blocks for the mailbox watchdog.
//!
//! This crate contains:
//! - **config**: Schema, loader, env overrides, and per-mailbox resolution
//! - **error**: `MonitorError` / `ConfigError`
//! - **source**: The `MailSource` / `MailSession` contract adapters implement
//! - **store**: The `StatusStore` trait and its SQLite implementation
//! - **types**: Daily outcomes, poll verdicts, and query shapes

pub mod config;
pub mod error;
pub mod source;
pub mod store;
pub mod types;
pub mod utils;

pub use config::{Config, EffectiveConfig, MailProtocol};
pub use error::{ConfigError, MonitorError, Result};
pub use source::{FetchedMessage, MailSession, MailSource, MessageRef};
pub use store::{SqliteStatusStore, StatusStore};
pub use types::{CheckVerdict, DailyOutcome, MailboxStatus, MailboxSummary, StatusReport};
