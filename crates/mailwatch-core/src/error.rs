//! Error types shared by every Mailwatch crate.
//!
//! A poll cycle either completes, fails with a [`MonitorError`], or is
//! cancelled. Cancellation is never represented here: it is carried by the
//! shutdown token and ends the monitor loop directly.

use thiserror::Error;

/// Errors raised while checking a mailbox or touching the status store.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Network or TLS failure reaching the mail source.
    #[error("connection error: {0}")]
    Connection(String),

    /// The mail source rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The mail source answered with something we could not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Reading or writing the status store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// No record exists for the mailbox today.
    #[error("no status recorded today for mailbox '{0}'")]
    NotFound(String),

    /// A configured regular expression does not compile.
    #[error("invalid {field} for mailbox '{mailbox}': {source}")]
    InvalidPattern {
        mailbox: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MonitorError {
    /// Whether the failure should simply be retried on the next cycle.
    ///
    /// Adapter and storage failures are transient from the monitor's point
    /// of view; configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Auth(_) | Self::Protocol(_) | Self::Persistence(_)
        )
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(e: std::io::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
