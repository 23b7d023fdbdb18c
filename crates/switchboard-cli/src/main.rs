//! Switchboard CLI: entry point.
//!
//! # Commands
//!
//! - `switchboard onboard`: write the default config
//! - `switchboard status`: show configuration and the pricing table
//! - `switchboard simulate`: route synthetic traffic through mock providers

mod helpers;
mod onboard;
mod simulate;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use switchboard_core::config::StrategyKind;
use switchboard_core::types::ProviderId;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Switchboard: route LLM requests across providers
#[derive(Parser)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.switchboard/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Onboard,

    /// Show configuration and pricing
    Status,

    /// Route synthetic requests through mock providers
    Simulate {
        /// Number of requests to route
        #[arg(short = 'n', long, default_value_t = 100)]
        requests: usize,

        /// Strategy override (priority, cost_optimized, quality_optimized, balanced, round_robin, ab_test, weighted)
        #[arg(short, long)]
        strategy: Option<StrategyKind>,

        /// Random failure rate applied to every mock (0.0 – 1.0)
        #[arg(short, long, default_value_t = 0.0)]
        failure_rate: f64,

        /// Providers that fail every call (repeatable)
        #[arg(long = "fail")]
        failing: Vec<ProviderId>,

        /// Simulated latency per call, in milliseconds
        #[arg(long, default_value_t = 5)]
        latency_ms: u64,

        /// Run an error-count reset and health sweep after the traffic
        #[arg(long, default_value_t = false)]
        maintenance: bool,

        /// Print stats as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path: Option<PathBuf> = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Onboard => onboard::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()),
        Commands::Simulate {
            requests,
            strategy,
            failure_rate,
            failing,
            latency_ms,
            maintenance,
            json,
            logs,
        } => {
            init_logging(logs);
            let options = simulate::SimulateOptions {
                requests,
                strategy,
                failure_rate,
                failing,
                latency_ms,
                maintenance,
                json,
            };
            simulate::run(config_path.as_deref(), options).await
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("switchboard=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
