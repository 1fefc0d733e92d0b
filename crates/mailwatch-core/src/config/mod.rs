//! Configuration system: schema, loading, env var overrides, and
//! per-mailbox resolution.
//!
//! # Usage
//! ```no_run
//! use mailwatch_core::config;
//!
//! let cfg = config::load_config(None).unwrap();
//! for mailbox in cfg.effective_mailboxes() {
//!     println!("{} every {}s", mailbox.name, mailbox.polling_frequency_seconds);
//! }
//! ```

pub mod effective;
pub mod loader;
pub mod schema;

// Re-export key types
pub use effective::EffectiveConfig;
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{Config, DatabaseConfig, MailProtocol, MailboxConfig, MailboxDefaults};
