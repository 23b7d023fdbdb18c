//! Maintenance service: periodic upkeep for a shared router.
//!
//! Two independent timers:
//! - every `reset_interval_secs`, zero the error windows
//! - every `health_check_interval_secs` (if nonzero), run a health sweep
//!
//! The router never does either on its own; embedders either run this
//! service or call the router directly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use switchboard_core::config::MaintenanceConfig;
use switchboard_core::types::ProviderId;
use switchboard_providers::HealthReport;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::router::Router;

/// Periodic error-window resets and health sweeps for one router.
pub struct MaintenanceService {
    router: Arc<Router>,
    reset_interval: Duration,
    /// `None` disables periodic health sweeps.
    health_interval: Option<Duration>,
    enabled: bool,
    shutdown: Arc<Notify>,
}

impl MaintenanceService {
    pub fn new(router: Arc<Router>, config: &MaintenanceConfig) -> Self {
        let health_interval = match config.health_check_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            router,
            // A zero period would make tokio's interval panic
            reset_interval: Duration::from_secs(config.reset_interval_secs.max(1)),
            health_interval,
            enabled: config.enabled,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run until [`stop`](Self::stop) is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        if !self.enabled {
            info!("maintenance disabled");
            self.shutdown.notified().await;
            return Ok(());
        }

        info!(
            reset_interval_s = self.reset_interval.as_secs(),
            health_interval_s = self.health_interval.map(|d| d.as_secs()),
            "maintenance service started"
        );

        let mut reset = periodic(self.reset_interval);
        let mut health = self.health_interval.map(periodic);

        loop {
            tokio::select! {
                _ = reset.tick() => {
                    self.router.reset_error_counts();
                }
                _ = next_tick(health.as_mut()) => {
                    self.sweep().await;
                }
                _ = self.shutdown.notified() => {
                    info!("maintenance service shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Stop the loop. A stop issued before `start` is awaited is not lost.
    pub fn stop(&self) {
        info!("stopping maintenance service");
        self.shutdown.notify_one();
    }

    /// Reset error windows and run a health sweep right now.
    pub async fn trigger_now(&self) -> BTreeMap<ProviderId, HealthReport> {
        self.router.reset_error_counts();
        self.sweep().await
    }

    async fn sweep(&self) -> BTreeMap<ProviderId, HealthReport> {
        let reports = self.router.health_check_all().await;
        let unhealthy = reports.values().filter(|r| !r.is_healthy()).count();
        if unhealthy > 0 {
            warn!(unhealthy, total = reports.len(), "health sweep found unhealthy providers");
        } else {
            debug!(total = reports.len(), "health sweep: all providers healthy");
        }
        reports
    }
}

/// Interval whose first tick is one full period away.
fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
