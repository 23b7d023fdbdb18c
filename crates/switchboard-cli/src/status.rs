//! `switchboard status`: show configuration and the pricing table.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use switchboard_core::config::{get_config_path, load_config, ProviderSettings};
use switchboard_core::types::ProviderId;
use switchboard_providers::pricing::find_pricing;

use crate::helpers::{flag, print_title};

/// Run the status command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let config = load_config(Some(&config_path));

    print_title("Switchboard Status");

    println!(
        "  {:<22} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    // Router
    let router = &config.router;
    println!("  {:<22} {}", "Strategy:".bold(), router.strategy);
    println!(
        "  {:<22} {}",
        "Retries:".bold(),
        format!("max {}", router.max_retries).dimmed()
    );
    println!(
        "  {:<22} {} | serving cutoff: {}",
        "Error thresholds:".bold(),
        format!("quarantine at {}", router.quarantine_threshold).dimmed(),
        format!("{}", router.serving_error_threshold).dimmed(),
    );
    println!(
        "  {:<22} {}s | A/B split: {}",
        "Health timeout:".bold(),
        router.health_check_timeout_secs,
        router.ab_split,
    );

    // Maintenance
    let maintenance = &config.maintenance;
    let schedule = if maintenance.enabled {
        let health = match maintenance.health_check_interval_secs {
            0 => "off".to_string(),
            secs => format!("every {secs}s"),
        };
        format!(
            "reset every {}s, health sweep {}",
            maintenance.reset_interval_secs, health
        )
    } else {
        "disabled".dimmed().to_string()
    };
    println!("  {:<22} {}", "Maintenance:".bold(), schedule);

    // Providers
    println!();
    println!("  {}", "Providers:".bold());
    println!(
        "    {:<12} {:>4} {:>7} {:>8}  {:<24} {:>10} {:>10}",
        "", "prio", "weight", "quality", "model", "$/1K in", "$/1K out"
    );
    for id in ProviderId::ALL {
        println!("{}", provider_row(id, &config.providers.settings_for(id)));
    }

    println!();

    Ok(())
}

fn provider_row(id: ProviderId, settings: &ProviderSettings) -> String {
    let (model, input, output) = match find_pricing(id) {
        Some(spec) => (
            spec.default_model.to_string(),
            format!("{:.6}", spec.input_per_1k),
            format!("{:.6}", spec.output_per_1k),
        ),
        None => ("(varies)".to_string(), "-".to_string(), "-".to_string()),
    };
    format!(
        "  {} {:<12} {:>4} {:>7.2} {:>8.2}  {:<24} {:>10} {:>10}",
        flag(settings.enabled),
        id.display_name(),
        settings.priority,
        settings.weight,
        settings.quality_score,
        model,
        input,
        output,
    )
}
