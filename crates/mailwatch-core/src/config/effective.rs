//! Effective configuration: a mailbox's overrides merged with the shared
//! defaults and the built-in fallbacks.
//!
//! Resolution is per field: `override ?? default ?? fallback`. The four
//! pattern fields are copied through as-is; they never inherit.

use std::time::Duration;

use serde::Serialize;

use super::schema::{Config, MailProtocol, MailboxConfig, MailboxDefaults};

/// Built-in fallback port (IMAPS).
pub const FALLBACK_PORT: u16 = 993;

/// Built-in fallback polling interval in seconds.
pub const FALLBACK_POLLING_SECONDS: u64 = 60;

/// Built-in fallback for implicit TLS.
pub const FALLBACK_USE_SSL: bool = true;

/// A mailbox configuration with every inheritable field populated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub name: String,
    pub protocol: MailProtocol,
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub polling_frequency_seconds: u64,
    pub expected_sender_emails: Vec<String>,
    pub expected_subject_pattern: Option<String>,
    pub expected_body_pattern: Option<String>,
    pub fail_subject_pattern: Option<String>,
    pub fail_body_pattern: Option<String>,
}

impl EffectiveConfig {
    /// Merge `mailbox` over `defaults`.
    pub fn resolve(mailbox: &MailboxConfig, defaults: &MailboxDefaults) -> Self {
        Self {
            name: mailbox.name.clone(),
            protocol: mailbox
                .protocol
                .or(defaults.protocol)
                .unwrap_or(MailProtocol::Imap),
            host: pick(&mailbox.host, &defaults.host).unwrap_or_default(),
            port: mailbox.port.or(defaults.port).unwrap_or(FALLBACK_PORT),
            use_ssl: mailbox.use_ssl.or(defaults.use_ssl).unwrap_or(FALLBACK_USE_SSL),
            username: pick(&mailbox.username, &defaults.username).unwrap_or_default(),
            password: pick(&mailbox.password, &defaults.password).unwrap_or_default(),
            polling_frequency_seconds: mailbox
                .polling_frequency_seconds
                .or(defaults.polling_frequency_seconds)
                .unwrap_or(FALLBACK_POLLING_SECONDS),
            expected_sender_emails: pick(
                &mailbox.expected_sender_emails,
                &defaults.expected_sender_emails,
            )
            .unwrap_or_default(),
            expected_subject_pattern: mailbox.expected_subject_pattern.clone(),
            expected_body_pattern: mailbox.expected_body_pattern.clone(),
            fail_subject_pattern: mailbox.fail_subject_pattern.clone(),
            fail_body_pattern: mailbox.fail_body_pattern.clone(),
        }
    }

    /// Whether a success pattern (subject or body) is configured.
    pub fn has_success_pattern(&self) -> bool {
        is_set(&self.expected_subject_pattern) || is_set(&self.expected_body_pattern)
    }

    /// Whether a failure pattern (subject or body) is configured.
    pub fn has_fail_pattern(&self) -> bool {
        is_set(&self.fail_subject_pattern) || is_set(&self.fail_body_pattern)
    }

    /// Whether candidates are restricted to a sender list.
    pub fn has_sender_filter(&self) -> bool {
        !self.expected_sender_emails.is_empty()
    }

    /// Sleep between two poll cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling_frequency_seconds)
    }
}

impl Config {
    /// Resolve every configured mailbox, preserving configuration order.
    pub fn effective_mailboxes(&self) -> Vec<EffectiveConfig> {
        self.mailboxes
            .iter()
            .map(|m| EffectiveConfig::resolve(m, &self.defaults))
            .collect()
    }
}

fn pick<T: Clone>(over: &Option<T>, default: &Option<T>) -> Option<T> {
    over.clone().or_else(|| default.clone())
}

fn is_set(pattern: &Option<String>) -> bool {
    pattern.as_deref().is_some_and(|p| !p.is_empty())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
