//! `switchboard onboard`: write the default configuration.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use switchboard_core::config::{get_config_path, save_config, Config};
use switchboard_core::types::ProviderId;

/// Run the onboard command.
pub fn run(path: Option<&Path>) -> Result<()> {
    crate::helpers::print_title("Switchboard — Setup");

    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let created = write_default_config(&config_path)?;

    if created {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Run `switchboard simulate` to try the router.".green()
    );
    println!();

    Ok(())
}

/// Write a starter config unless one is already there. Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&starter_config(), Some(path))
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    Ok(true)
}

/// Defaults plus an explicit entry for every known provider, so the file
/// shows what can be tuned.
fn starter_config() -> Config {
    let mut config = Config::default();
    for (rank, id) in ProviderId::ALL.into_iter().enumerate() {
        config.providers.entry(id).priority = rank as i32 + 1;
    }
    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
