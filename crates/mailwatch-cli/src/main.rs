//! Mailwatch CLI: the `mailwatch` binary.
//!
//! Commands:
//! - `mailwatch run`  Poll every configured mailbox until Ctrl+C
//! - `mailwatch status <NAME>`  Today's status of one mailbox
//! - `mailwatch check <NAME> --fail`  Whether today's report signalled a failure
//! - `mailwatch list`  Dashboard of every configured mailbox
//! - `mailwatch init`  Write a sample configuration

mod helpers;
mod init;
mod run;
mod status;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Mailwatch: daily report watchdog for IMAP/POP3 mailboxes.
#[derive(Parser)]
#[command(name = "mailwatch", version, about, long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ~/.mailwatch/config.json).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring every configured mailbox.
    Run {
        /// Show debug logs.
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show whether the expected report arrived today.
    ///
    /// Exits with code 3 unless the success pattern matched.
    Status {
        /// Mailbox name (case-insensitive).
        name: String,

        /// Print the status as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check today's report for a mailbox.
    ///
    /// With `--fail`, exits with code 3 when a failure pattern matched.
    Check {
        /// Mailbox name (case-insensitive).
        name: String,

        /// Report the failure pattern instead of the success pattern.
        #[arg(long, default_value_t = false)]
        fail: bool,

        /// Print the status as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the status of every configured mailbox.
    List {
        /// Print the list as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write a sample configuration file.
    Init {
        /// Overwrite an existing config file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run { logs } => {
            init_logging(if logs { "mailwatch=debug,info" } else { "info" });
            run::run(config_path).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { name, json } => {
            init_logging("warn");
            Ok(status::status(config_path, &name, json).await?.into())
        }
        Commands::Check { name, fail, json } => {
            init_logging("warn");
            let code = if fail {
                status::check_fail(config_path, &name, json).await?
            } else {
                status::status(config_path, &name, json).await?
            };
            Ok(code.into())
        }
        Commands::List { json } => {
            init_logging("warn");
            status::list(config_path, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            init::run(config_path, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Initialize tracing/logging on stderr; `RUST_LOG` overrides `default`.
fn init_logging(default: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
