//! `mailwatch init`: write a sample configuration.

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;

use mailwatch_core::config::{get_config_path, save_config, Config};

/// Write [`Config::sample`] to `config_path` (or the default path).
///
/// An existing file is left alone unless `force` is set.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    if path.exists() && !force {
        bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    save_config(&Config::sample(), Some(&path))?;

    println!();
    println!("  {} wrote sample config to {}", "✓".green(), path.display());
    println!();
    println!("  Next steps:");
    println!("    1. Set host, username and password under \"defaults\"");
    println!("    2. Adjust the mailboxes and their patterns");
    println!("    3. Run {}", "mailwatch run".cyan());
    println!();
    Ok(())
}
