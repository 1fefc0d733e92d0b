//! `mailwatch run`: polls every configured mailbox until Ctrl+C.
//!
//! Startup sequence:
//! 1. Load and validate config
//! 2. Open the status database
//! 3. Build one monitor per mailbox (patterns compiled up front)
//! 4. Spawn the monitors, wait for Ctrl+C or for every monitor to end
//! 5. Cancel, wait for the monitors to wind down, close the database

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use mailwatch_core::config::get_config_path;
use mailwatch_core::utils::expand_home;
use mailwatch_monitor::Orchestrator;

use crate::helpers;

/// Run the watchdog.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    helpers::print_banner();

    let config = helpers::load(config_path)?;
    let store = helpers::open_store(&config).await?;

    let mut orchestrator =
        Orchestrator::new(&config, store.clone()).context("failed to build monitors")?;

    let shown_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);
    println!("  Config:    {}", shown_path.display());
    println!(
        "  Database:  {}",
        expand_home(&config.database.path).display()
    );
    println!("  Mailboxes: {}", orchestrator.len());
    for effective in config.effective_mailboxes() {
        println!(
            "    {:<22} {} {}:{} every {}s",
            effective.name,
            effective.protocol,
            effective.host,
            effective.port,
            effective.polling_frequency_seconds
        );
    }
    println!();

    if orchestrator.is_empty() {
        println!("  ⚠  No mailboxes configured. Add some to {}", shown_path.display());
        println!("     or run `mailwatch init` to write a sample.");
        println!();
    }

    info!(mailboxes = ?orchestrator.mailbox_names(), "watchdog starting");

    let shutdown = CancellationToken::new();
    let mut monitors = orchestrator.start(shutdown.clone());

    tokio::select! {
        joined = &mut monitors => {
            if let Err(e) = joined {
                error!(error = %e, "monitor supervisor failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            shutdown.cancel();
            if let Err(e) = monitors.await {
                error!(error = %e, "monitor supervisor failed");
            }
        }
    }

    for (name, status) in orchestrator.statuses().await {
        info!(mailbox = %name, status = %status, "final status");
    }
    store.close().await;

    println!("  Watchdog stopped. Goodbye!");
    Ok(())
}
