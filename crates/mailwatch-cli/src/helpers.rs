//! Shared CLI helpers: config loading, store opening, output formatting.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use mailwatch_core::config::{load_config, Config};
use mailwatch_core::store::SqliteStatusStore;
use mailwatch_core::utils::expand_home;

/// Load and validate the configuration.
pub fn load(config_path: Option<&Path>) -> Result<Config> {
    let config = load_config(config_path).context("failed to load config")?;
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Open the status database named by the configuration.
pub async fn open_store(config: &Config) -> Result<Arc<SqliteStatusStore>> {
    let path = expand_home(&config.database.path);
    let store = SqliteStatusStore::new(&path)
        .await
        .with_context(|| format!("failed to open status database: {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Render an optional UTC timestamp in local time.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Green check for `true`, red cross for `false`.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Print the banner shown before `run`.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📬 Mailwatch".cyan().bold(), version.dimmed());
    println!("{}", "Press Ctrl+C to stop.".dimmed());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_time_none() {
        assert_eq!(format_time(None), "-");
    }

    #[test]
    fn test_format_time_some() {
        let t = Utc.with_ymd_and_hms(2024, 5, 2, 6, 30, 0).unwrap();
        let rendered = format_time(Some(t));
        assert_eq!(rendered.len(), "2024-05-02 06:30:00".len());
        assert!(rendered.ends_with(":30:00"));
    }

    #[test]
    fn test_load_missing_file_gives_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(Some(&dir.path().join("absent.json"))).unwrap();
        assert!(config.mailboxes.is_empty());
    }

    #[test]
    fn test_load_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mailboxes":[{"name":"Invoices"},{"name":"INVOICES"}]}"#,
        )
        .unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
