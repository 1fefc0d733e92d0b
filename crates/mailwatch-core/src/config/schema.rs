//! Configuration schema: the on-disk shape of `~/.mailwatch/config.json`.
//!
//! Hierarchy: `Config` → `MailboxDefaults`, `Vec<MailboxConfig>`,
//! `DatabaseConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Every inheritable mailbox field is an `Option` so that "not set" can be
//! told apart from "set to the type's default" during resolution.

use std::collections::HashSet;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.mailwatch/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Fallback values inherited by every mailbox.
    pub defaults: MailboxDefaults,
    /// Monitored mailboxes, in the order they are reported.
    pub mailboxes: Vec<MailboxConfig>,
    pub database: DatabaseConfig,
}

impl Config {
    /// Check invariants the monitor relies on.
    ///
    /// - mailbox names are non-empty and unique (case-insensitive, matching
    ///   how the status store looks them up)
    /// - polling intervals are positive
    /// - every configured pattern compiles
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.polling_frequency_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "defaults.pollingFrequencySeconds must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for mailbox in &self.mailboxes {
            let name = mailbox.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("mailbox name must not be empty".into()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate mailbox name '{name}'"
                )));
            }
            if mailbox.polling_frequency_seconds == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "mailbox '{name}': pollingFrequencySeconds must be greater than zero"
                )));
            }
            for (field, pattern) in mailbox.patterns() {
                if let Some(p) = pattern.filter(|p| !p.is_empty()) {
                    RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                        ConfigError::Invalid(format!("mailbox '{name}': invalid {field}: {e}"))
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Look up a mailbox by name (case-insensitive).
    pub fn mailbox(&self, name: &str) -> Option<&MailboxConfig> {
        self.mailboxes
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// A starter configuration written by `mailwatch init`.
    pub fn sample() -> Self {
        Self {
            defaults: MailboxDefaults {
                protocol: Some(MailProtocol::Imap),
                host: Some("imap.example.com".into()),
                port: Some(993),
                use_ssl: Some(true),
                username: Some("reports@example.com".into()),
                password: Some("change-me".into()),
                polling_frequency_seconds: Some(300),
                expected_sender_emails: None,
            },
            mailboxes: vec![
                MailboxConfig {
                    expected_sender_emails: Some(vec!["billing@example.com".into()]),
                    expected_subject_pattern: Some(r"invoice #\d+".into()),
                    fail_subject_pattern: Some("error|failed".into()),
                    ..MailboxConfig::named("Invoices")
                },
                MailboxConfig {
                    polling_frequency_seconds: Some(900),
                    expected_body_pattern: Some("backup completed".into()),
                    ..MailboxConfig::named("Nightly Backup")
                },
            ],
            database: DatabaseConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────
// Protocol
// ─────────────────────────────────────────────

/// Mail access protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProtocol {
    #[default]
    #[serde(alias = "Imap", alias = "IMAP")]
    Imap,
    #[serde(alias = "Pop3", alias = "POP3")]
    Pop3,
}

impl std::fmt::Display for MailProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap => write!(f, "IMAP"),
            Self::Pop3 => write!(f, "POP3"),
        }
    }
}

// ─────────────────────────────────────────────
// Mailboxes
// ─────────────────────────────────────────────

/// Process-wide fallback values inherited by every mailbox.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MailboxDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<MailProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Implicit TLS on connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_frequency_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sender_emails: Option<Vec<String>>,
}

/// One monitored mailbox.
///
/// The connection fields override [`MailboxDefaults`]; the four pattern
/// fields never inherit.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MailboxConfig {
    /// Unique key; also the identifier stored with each daily outcome.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<MailProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_frequency_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sender_emails: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_subject_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_body_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_subject_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_body_pattern: Option<String>,
}

impl MailboxConfig {
    /// A mailbox with only its name set; everything else inherits.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The pattern fields paired with their JSON key, for validation messages.
    fn patterns(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("expectedSubjectPattern", self.expected_subject_pattern.as_deref()),
            ("expectedBodyPattern", self.expected_body_pattern.as_deref()),
            ("failSubjectPattern", self.fail_subject_pattern.as_deref()),
            ("failBodyPattern", self.fail_body_pattern.as_deref()),
        ]
    }
}

// ─────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────

/// Status store location.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// SQLite file path; `~` is expanded.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.mailwatch/mailwatch.db".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
