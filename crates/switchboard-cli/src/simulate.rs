//! `switchboard simulate`: route synthetic traffic through mock providers.
//!
//! Registers one [`MockProvider`] per enabled provider, fires the requested
//! number of generations concurrently, then prints the router's stats.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use switchboard_core::config::{load_config, Config, StrategyKind};
use switchboard_core::types::{GenerationRequest, ProviderId};
use switchboard_core::utils::timestamp;
use switchboard_providers::{HealthReport, MockProvider, ProviderErrorKind};
use switchboard_router::{MaintenanceService, Router, RouterError, RouterStats};

use crate::helpers::{flag, format_cost, format_rate, print_title};

const PROMPTS: &[&str] = &[
    "Summarize the plot of Hamlet in two sentences.",
    "Write a haiku about borrow checking.",
    "Explain the difference between a mutex and a semaphore.",
    "Translate 'good morning' into French, Spanish and German.",
];

/// Flags for one simulation run.
pub struct SimulateOptions {
    pub requests: usize,
    pub strategy: Option<StrategyKind>,
    pub failure_rate: f64,
    pub failing: Vec<ProviderId>,
    pub latency_ms: u64,
    pub maintenance: bool,
    pub json: bool,
}

/// Outcome counts for the whole run.
#[derive(Debug, Default, Serialize)]
struct Tally {
    succeeded: usize,
    no_providers: usize,
    exhausted: usize,
    served_by: BTreeMap<ProviderId, usize>,
}

#[derive(Serialize)]
struct Report<'a> {
    timestamp: String,
    requests: usize,
    tally: &'a Tally,
    stats: &'a RouterStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<&'a BTreeMap<ProviderId, HealthReport>>,
}

/// Run the simulate command.
pub async fn run(path: Option<&Path>, options: SimulateOptions) -> Result<()> {
    if !(0.0..=1.0).contains(&options.failure_rate) {
        bail!("--failure-rate must be between 0.0 and 1.0");
    }

    let mut config = load_config(path);
    if let Some(strategy) = options.strategy {
        config.router.strategy = strategy;
    }

    let router = Arc::new(build_router(&config, &options));
    if router.provider_ids().is_empty() {
        bail!("no providers enabled in config");
    }
    info!(
        strategy = %router.strategy(),
        providers = router.provider_ids().len(),
        requests = options.requests,
        "starting simulation"
    );

    let tally = drive(&router, options.requests).await;

    let health = if options.maintenance {
        let service = MaintenanceService::new(router.clone(), &config.maintenance);
        Some(service.trigger_now().await)
    } else {
        None
    };

    let stats = router.get_stats();
    if options.json {
        let report = Report {
            timestamp: timestamp(),
            requests: options.requests,
            tally: &tally,
            stats: &stats,
            health: health.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&tally, &stats, health.as_ref());
    }

    Ok(())
}

/// Router with one mock per enabled provider.
fn build_router(config: &Config, options: &SimulateOptions) -> Router {
    let router = Router::from_config(config);
    let latency = Duration::from_millis(options.latency_ms);

    for id in ProviderId::ALL {
        if !config.providers.settings_for(id).enabled {
            debug!(provider = %id, "skipping disabled provider");
            continue;
        }
        let mut mock = MockProvider::new(id)
            .with_latency(latency)
            .with_failure_rate(options.failure_rate);
        if options.failing.contains(&id) {
            mock = mock.failing(ProviderErrorKind::Backend);
        }
        router.add_provider(Arc::new(mock));
    }

    router
}

/// Fire `requests` generations concurrently and count the outcomes.
async fn drive(router: &Arc<Router>, requests: usize) -> Tally {
    let mut set = JoinSet::new();
    for i in 0..requests {
        let router = router.clone();
        let request = GenerationRequest::new(PROMPTS[i % PROMPTS.len()])
            .with_max_tokens(256)
            .with_metadata("request_index", serde_json::json!(i));
        set.spawn(async move { router.generate(&request).await });
    }

    let mut tally = Tally::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(response)) => {
                tally.succeeded += 1;
                *tally.served_by.entry(response.provider).or_default() += 1;
            }
            Ok(Err(RouterError::NoProvidersAvailable)) => tally.no_providers += 1,
            Ok(Err(RouterError::RetriesExhausted { .. })) => tally.exhausted += 1,
            Err(e) => error!(error = %e, "simulation task failed"),
        }
    }
    tally
}

fn print_report(
    tally: &Tally,
    stats: &RouterStats,
    health: Option<&BTreeMap<ProviderId, HealthReport>>,
) {
    print_title("Switchboard Simulation");

    println!("  {:<18} {}", "Strategy:".bold(), stats.strategy);
    println!(
        "  {:<18} {} ok, {} exhausted, {} no provider",
        "Requests:".bold(),
        tally.succeeded.to_string().green(),
        tally.exhausted.to_string().red(),
        tally.no_providers.to_string().red(),
    );
    println!("  {:<18} {}", "Total cost:".bold(), format_cost(stats.total_cost));

    println!();
    println!(
        "    {:<12} {:>6} {:>6} {:>6} {:>8} {:>12} {:>9} {:>7}",
        "", "reqs", "ok", "fail", "success", "cost", "avg ms", "errors"
    );
    for m in &stats.providers {
        println!(
            "  {} {:<12} {:>6} {:>6} {:>6} {:>8} {:>12} {:>9.1} {:>7}",
            flag(m.is_available),
            m.provider.display_name(),
            m.total_requests,
            m.successful_requests,
            m.failed_requests,
            format_rate(m.success_rate),
            format_cost(m.total_cost),
            m.avg_response_time * 1000.0,
            m.error_count_window,
        );
    }

    if let Some(health) = health {
        println!();
        println!("  {}", "Health sweep:".bold());
        for (id, report) in health {
            let detail = match &report.error {
                Some(error) => error.dimmed().to_string(),
                None => format!("{}ms", report.latency.as_millis()).dimmed().to_string(),
            };
            println!("    {} {:<12} {}", flag(report.is_healthy()), id.display_name(), detail);
        }
    }

    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SimulateOptions {
        SimulateOptions {
            requests: 20,
            strategy: None,
            failure_rate: 0.0,
            failing: Vec::new(),
            latency_ms: 0,
            maintenance: false,
            json: false,
        }
    }

    #[test]
    fn build_router_skips_disabled() {
        let mut config = Config::default();
        config.providers.entry(ProviderId::Groq).enabled = false;

        let router = build_router(&config, &options());
        let ids = router.provider_ids();
        assert_eq!(ids.len(), ProviderId::ALL.len() - 1);
        assert!(!ids.contains(&ProviderId::Groq));
    }

    #[tokio::test]
    async fn drive_counts_every_request() {
        let mut config = Config::default();
        config.router.strategy = StrategyKind::RoundRobin;

        let router = Arc::new(build_router(&config, &options()));
        let tally = drive(&router, 16).await;

        assert_eq!(tally.succeeded, 16);
        assert_eq!(tally.served_by.values().sum::<usize>(), 16);
        assert_eq!(router.get_stats().total_requests, 16);
    }

    #[tokio::test]
    async fn failing_provider_gets_quarantined() {
        let config = Config::default();
        let opts = SimulateOptions {
            failing: vec![ProviderId::OpenAi],
            ..options()
        };

        let router = Arc::new(build_router(&config, &opts));
        let tally = drive(&router, 10).await;

        // The first request spends its whole budget on the top-priority
        // provider; everything after it is routed around the quarantine.
        assert_eq!(tally.exhausted, 1);
        assert_eq!(tally.succeeded, 9);
        assert!(!tally.served_by.contains_key(&ProviderId::OpenAi));
        assert!(!router.metrics(ProviderId::OpenAi).unwrap().is_available);
    }

    #[tokio::test]
    async fn report_serializes() {
        let router = Arc::new(build_router(&Config::default(), &options()));
        let tally = drive(&router, 3).await;
        let stats = router.get_stats();

        let report = Report {
            timestamp: timestamp(),
            requests: 3,
            tally: &tally,
            stats: &stats,
            health: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tally"]["succeeded"], 3);
        assert_eq!(json["stats"]["strategy"], "priority");
        assert!(json.get("health").is_none());
    }
}
