//! `mailwatch status`, `check --fail` and `list`: read today's outcomes.
//!
//! Exit codes follow the HTTP endpoints these commands stand in for:
//! `0` when the mailbox is healthy, `3` ("service unavailable") otherwise.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use mailwatch_core::error::MonitorError;
use mailwatch_core::types::{MailboxStatus, MailboxSummary, StatusReport};
use mailwatch_core::utils::{format_day, today};
use mailwatch_monitor::StatusQuery;

use crate::helpers::{self, format_time, mark};

/// Healthy.
pub const EXIT_OK: u8 = 0;
/// Report missing, not matched, or failed.
pub const EXIT_UNAVAILABLE: u8 = 3;

/// Today's success status of one mailbox.
pub async fn status(config_path: Option<&Path>, name: &str, json: bool) -> Result<u8> {
    let config = helpers::load(config_path)?;
    let store = helpers::open_store(&config).await?;
    let query = StatusQuery::new(&config, store.clone());

    let report = query.get_report(name).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if config.mailbox(name).is_none() {
            println!("  {}", format!("'{name}' is not a configured mailbox").dimmed());
        }
        print_report(name, &report);
    }

    Ok(if report.pattern_matched {
        EXIT_OK
    } else {
        EXIT_UNAVAILABLE
    })
}

/// Whether today's matched report also matched a failure pattern.
pub async fn check_fail(config_path: Option<&Path>, name: &str, json: bool) -> Result<u8> {
    let config = helpers::load(config_path)?;
    let store = helpers::open_store(&config).await?;
    let query = StatusQuery::new(&config, store.clone());

    let outcome = query.get_outcome(name).await;
    store.close().await;

    match outcome {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!();
                println!("  {}", name.cyan().bold());
                println!(
                    "  {:<18} {}",
                    "Failure:".bold(),
                    failure(outcome.fail_pattern_matched)
                );
                if let Some(subject) = &outcome.last_failed_subject {
                    println!("  {:<18} {}", "Failed subject:".bold(), subject);
                }
                println!(
                    "  {:<18} {}",
                    "Last checked:".bold(),
                    format_time(Some(outcome.last_check_time))
                );
                println!();
            }
            Ok(if outcome.fail_pattern_matched {
                EXIT_UNAVAILABLE
            } else {
                EXIT_OK
            })
        }
        Err(MonitorError::NotFound(_)) => {
            let report = StatusReport::from(&MailboxStatus::NotCheckedYet);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(name, &report);
            }
            Ok(EXIT_UNAVAILABLE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Dashboard of every configured mailbox.
pub async fn list(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = helpers::load(config_path)?;
    let store = helpers::open_store(&config).await?;
    let query = StatusQuery::new(&config, store.clone());

    let summaries = query.list_all_statuses().await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!();
    println!(
        "{}  {}",
        "📬 Mailwatch Status".cyan().bold(),
        format_day(today()).dimmed()
    );
    println!();

    if summaries.is_empty() {
        println!("  {}", "No mailboxes configured.".dimmed());
        println!();
        return Ok(());
    }

    for summary in &summaries {
        print_summary_line(summary);
    }
    println!();
    Ok(())
}

fn print_report(name: &str, report: &StatusReport) {
    println!();
    println!("  {}", name.cyan().bold());
    if let Some(error) = &report.error {
        println!("  {}", error.yellow());
        println!();
        return;
    }
    println!("  {:<18} {}", "Report received:".bold(), mark(report.pattern_matched));
    println!("  {:<18} {}", "Failure:".bold(), failure(report.fail_pattern_matched));
    if let Some(subject) = &report.last_matched_subject {
        println!("  {:<18} {}", "Subject:".bold(), subject);
    }
    if let Some(subject) = &report.last_failed_subject {
        println!("  {:<18} {}", "Failed subject:".bold(), subject);
    }
    println!("  {:<18} {}", "Received:".bold(), format_time(report.last_received_date));
    println!("  {:<18} {}", "Last checked:".bold(), format_time(report.last_checked));
    println!();
}

fn failure(matched: bool) -> String {
    if matched {
        format!("{} matched", mark(false))
    } else {
        format!("{} none", mark(true))
    }
}

fn print_summary_line(summary: &MailboxSummary) {
    let report = &summary.report;
    let state = if report.error.is_some() {
        "not checked".dimmed().to_string()
    } else if report.fail_pattern_matched {
        "failed".red().bold().to_string()
    } else if report.pattern_matched {
        "ok".green().bold().to_string()
    } else {
        "missing".yellow().bold().to_string()
    };

    let mut filters = Vec::new();
    if summary.has_pattern_configuration {
        filters.push("pattern");
    }
    if summary.has_fail_pattern_configuration {
        filters.push("fail");
    }
    if summary.has_sender_configuration {
        filters.push("sender");
    }

    println!(
        "  {:<24} {:<20} {:<20} {}",
        summary.name.bold(),
        state,
        format_time(report.last_checked).dimmed(),
        filters.join(",").dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use mailwatch_core::config::{save_config, Config, DatabaseConfig, MailboxConfig};
    use mailwatch_core::store::{SqliteStatusStore, StatusStore};
    use mailwatch_core::types::CheckVerdict;

    /// Config with two mailboxes and a database inside `dir`; "Invoices"
    /// has a matched (and failed) outcome recorded today.
    async fn setup(dir: &Path) -> std::path::PathBuf {
        let db_path = dir.join("status.db");
        let config = Config {
            mailboxes: vec![
                MailboxConfig {
                    fail_subject_pattern: Some("error".into()),
                    ..MailboxConfig::named("Invoices")
                },
                MailboxConfig::named("Backups"),
            ],
            database: DatabaseConfig {
                path: db_path.display().to_string(),
            },
            ..Config::default()
        };
        let config_path = dir.join("config.json");
        save_config(&config, Some(&config_path)).unwrap();

        let store = SqliteStatusStore::new(&db_path).await.unwrap();
        let outcome = CheckVerdict {
            pattern_matched: true,
            fail_pattern_matched: true,
            matched_subject: Some("Invoice #4821 - Error".into()),
            failed_subject: Some("Invoice #4821 - Error".into()),
            received_at: Some(Utc::now()),
        }
        .into_outcome("Invoices", today(), Utc::now());
        store.upsert(&outcome).await.unwrap();
        store.close().await;

        config_path
    }

    #[tokio::test]
    async fn test_status_matched_exits_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = setup(dir.path()).await;
        let code = status(Some(&config_path), "invoices", true).await.unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_status_not_checked_exits_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = setup(dir.path()).await;
        let code = status(Some(&config_path), "Backups", true).await.unwrap();
        assert_eq!(code, EXIT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_check_fail_matched_exits_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = setup(dir.path()).await;
        let code = check_fail(Some(&config_path), "Invoices", false).await.unwrap();
        assert_eq!(code, EXIT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_check_fail_unknown_mailbox_exits_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = setup(dir.path()).await;
        let code = check_fail(Some(&config_path), "Nope", true).await.unwrap();
        assert_eq!(code, EXIT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_list_prints_every_mailbox() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = setup(dir.path()).await;
        list(Some(&config_path), false).await.unwrap();
        list(Some(&config_path), true).await.unwrap();
    }
}
