//! Config loader: reads `~/.mailwatch/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.mailwatch/config.json` (or an explicit path)
//! 3. Environment variables `MAILWATCH_<SECTION>__<FIELD>` (override JSON)
//!
//! A missing file is not an error: the watchdog starts with no mailboxes.
//! A file that exists but cannot be read or parsed is reported, since
//! silently watching nothing would defeat the point.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::schema::{Config, MailProtocol};
use crate::error::ConfigError;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from `path` (or the default path) + env vars.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Ok(apply_env_overrides(Config::default()));
    }

    debug!("Loading config from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    Ok(apply_env_overrides(config))
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<(), ConfigError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: config_path.display().to_string(),
        source,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    std::fs::write(&config_path, json).map_err(write_err)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `MAILWATCH_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `MAILWATCH_DEFAULTS__PROTOCOL` → `defaults.protocol` (`imap` / `pop3`)
/// - `MAILWATCH_DEFAULTS__HOST` → `defaults.host`
/// - `MAILWATCH_DEFAULTS__PORT` → `defaults.port`
/// - `MAILWATCH_DEFAULTS__USE_SSL` → `defaults.use_ssl`
/// - `MAILWATCH_DEFAULTS__USERNAME` → `defaults.username`
/// - `MAILWATCH_DEFAULTS__PASSWORD` → `defaults.password`
/// - `MAILWATCH_DEFAULTS__POLLING_FREQUENCY_SECONDS` → `defaults.polling_frequency_seconds`
/// - `MAILWATCH_DATABASE__PATH` → `database.path`
fn apply_env_overrides(mut config: Config) -> Config {
    let defaults = &mut config.defaults;

    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__PROTOCOL") {
        match val.to_lowercase().as_str() {
            "imap" => defaults.protocol = Some(MailProtocol::Imap),
            "pop3" => defaults.protocol = Some(MailProtocol::Pop3),
            _ => debug!(value = %val, "ignoring unknown MAILWATCH_DEFAULTS__PROTOCOL"),
        }
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__HOST") {
        defaults.host = Some(val);
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            defaults.port = Some(p);
        }
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__USE_SSL") {
        defaults.use_ssl = Some(val == "true" || val == "1");
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__USERNAME") {
        defaults.username = Some(val);
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__PASSWORD") {
        defaults.password = Some(val);
    }
    if let Ok(val) = std::env::var("MAILWATCH_DEFAULTS__POLLING_FREQUENCY_SECONDS") {
        if let Ok(n) = val.parse::<u64>() {
            defaults.polling_frequency_seconds = Some(n);
        }
    }

    if let Ok(val) = std::env::var("MAILWATCH_DATABASE__PATH") {
        config.database.path = val;
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
