//! Router: the public entry point.
//!
//! Owns the provider registry, per-provider metrics and the active strategy,
//! all behind one mutex. Provider calls happen outside the lock: it is taken
//! only to pick a provider and to record the outcome.
//!
//! Request flow:
//! 1. Filter to providers that are available and below the serving error threshold
//! 2. Empty → `NoProvidersAvailable`; one → use it; otherwise ask the strategy
//! 3. Call the provider; record the outcome
//! 4. On failure, quarantine at the threshold and retry until the budget is spent

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use switchboard_core::config::{Config, ProviderSettings, ProvidersConfig, RouterConfig, StrategyKind};
use switchboard_core::types::{GenerationRequest, GenerationResponse, ProviderId};
use switchboard_providers::{HealthReport, Provider, ProviderError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::RouterError;
use crate::metrics::{MetricsSnapshot, ProviderMetrics};
use crate::strategy::{Candidate, Strategy};

struct Registered {
    provider: Arc<dyn Provider>,
    metrics: ProviderMetrics,
}

struct RouterState {
    providers: HashMap<ProviderId, Registered>,
    /// Registration order; iteration order for every strategy.
    order: Vec<ProviderId>,
    strategy: Strategy,
}

impl RouterState {
    fn metrics_mut(&mut self, id: ProviderId) -> Option<&mut ProviderMetrics> {
        self.providers.get_mut(&id).map(|r| &mut r.metrics)
    }
}

fn retain_registered(state: &RouterState, ids: Vec<ProviderId>) -> Vec<ProviderId> {
    ids.into_iter()
        .filter(|id| {
            let found = state.providers.contains_key(id);
            if !found {
                warn!(provider = %id, "ignoring unregistered provider in A/B group");
            }
            found
        })
        .collect()
}

/// Point-in-time view of the router, safe to serialize.
#[derive(Clone, Debug, Serialize)]
pub struct RouterStats {
    pub strategy: StrategyKind,
    pub provider_count: usize,
    pub available_count: usize,
    pub total_requests: u64,
    pub total_cost: f64,
    /// Per-provider metrics, in registration order.
    pub providers: Vec<MetricsSnapshot>,
}

/// Routes generation requests across registered providers.
pub struct Router {
    config: RouterConfig,
    settings: ProvidersConfig,
    state: Mutex<RouterState>,
}

impl Router {
    /// Create an empty router. Providers get default settings on registration.
    pub fn new(config: RouterConfig) -> Self {
        Self::with_strategy(config, ProvidersConfig::default(), None)
    }

    /// Create an empty router from the full config, including per-provider settings.
    pub fn from_config(config: &Config) -> Self {
        Self::with_strategy(config.router.clone(), config.providers.clone(), None)
    }

    /// Like [`Router::new`] but with seeded randomness for A/B and weighted selection.
    pub fn with_seed(config: RouterConfig, seed: u64) -> Self {
        let strategy = Strategy::with_seed(config.strategy, config.ab_split, seed);
        Self::with_strategy(config, ProvidersConfig::default(), Some(strategy))
    }

    fn with_strategy(
        config: RouterConfig,
        settings: ProvidersConfig,
        strategy: Option<Strategy>,
    ) -> Self {
        let strategy = strategy.unwrap_or_else(|| Strategy::new(config.strategy, config.ab_split));
        Self {
            config,
            settings,
            state: Mutex::new(RouterState {
                providers: HashMap::new(),
                order: Vec::new(),
                strategy,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // ─────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────

    /// Register a provider with its configured settings.
    ///
    /// Replacing an already registered id keeps its registration slot but
    /// starts fresh metrics.
    pub fn add_provider(&self, provider: Arc<dyn Provider>) {
        let settings = self.settings.settings_for(provider.id());
        self.add_provider_with(provider, &settings);
    }

    /// Register a provider with explicit settings.
    pub fn add_provider_with(&self, provider: Arc<dyn Provider>, settings: &ProviderSettings) {
        let id = provider.id();
        let metrics = ProviderMetrics::with_settings(id, &settings.clone().normalized());

        let mut state = self.lock();
        let replaced = state
            .providers
            .insert(id, Registered { provider, metrics })
            .is_some();
        if !replaced {
            state.order.push(id);
        }
        info!(provider = %id, replaced, total = state.order.len(), "provider registered");
    }

    /// Drop a provider and its metrics. In-flight calls finish on their own.
    pub fn remove_provider(&self, id: ProviderId) -> bool {
        let mut state = self.lock();
        if state.providers.remove(&id).is_none() {
            return false;
        }
        state.order.retain(|p| *p != id);
        info!(provider = %id, "provider removed");
        true
    }

    /// Registered ids, in registration order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.lock().order.clone()
    }

    pub fn has_provider(&self, id: ProviderId) -> bool {
        self.lock().providers.contains_key(&id)
    }

    /// Copy of one provider's metrics.
    pub fn metrics(&self, id: ProviderId) -> Option<ProviderMetrics> {
        self.lock().providers.get(&id).map(|r| r.metrics.clone())
    }

    // ─────────────────────────────────────────────
    // Strategy configuration
    // ─────────────────────────────────────────────

    pub fn strategy(&self) -> StrategyKind {
        self.lock().strategy.kind()
    }

    pub fn set_strategy(&self, kind: StrategyKind) {
        let mut state = self.lock();
        let previous = state.strategy.kind();
        state.strategy.set_kind(kind);
        info!(from = %previous, to = %kind, "strategy changed");
    }

    /// Set A/B groups. Unregistered ids are dropped from the groups.
    pub fn set_ab_test_groups(&self, group_a: Vec<ProviderId>, group_b: Vec<ProviderId>) {
        let mut state = self.lock();
        let a = retain_registered(&state, group_a);
        let b = retain_registered(&state, group_b);
        debug!(a = ?a, b = ?b, "A/B groups set");
        state.strategy.set_groups(a, b);
    }

    pub fn update_provider_priority(&self, id: ProviderId, priority: i32) -> bool {
        self.update_metrics(id, "priority", |m| m.priority = priority)
    }

    /// Negative weights are clamped to 0.
    pub fn update_provider_weight(&self, id: ProviderId, weight: f64) -> bool {
        self.update_metrics(id, "weight", |m| m.weight = weight.max(0.0))
    }

    /// Quality is clamped to [0, 1].
    pub fn update_provider_quality(&self, id: ProviderId, quality: f64) -> bool {
        self.update_metrics(id, "quality", |m| m.quality_score = quality.clamp(0.0, 1.0))
    }

    /// Manually quarantine or rehabilitate a provider.
    pub fn set_provider_available(&self, id: ProviderId, available: bool) -> bool {
        self.update_metrics(id, "availability", |m| m.is_available = available)
    }

    fn update_metrics(
        &self,
        id: ProviderId,
        field: &str,
        apply: impl FnOnce(&mut ProviderMetrics),
    ) -> bool {
        let mut state = self.lock();
        match state.metrics_mut(id) {
            Some(metrics) => {
                apply(metrics);
                debug!(provider = %id, field, "provider setting updated");
                true
            }
            None => {
                warn!(provider = %id, field, "ignoring update for unregistered provider");
                false
            }
        }
    }

    // ─────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────

    /// Which provider the active strategy would pick right now.
    ///
    /// Advances round-robin and A/B state exactly like a real request.
    pub fn select_provider(&self, request: &GenerationRequest) -> Result<ProviderId, RouterError> {
        let mut state = self.lock();
        self.select_locked(&mut state, request, &HashSet::new())
            .map(|(id, _)| id)
            .ok_or(RouterError::NoProvidersAvailable)
    }

    fn is_candidate(&self, metrics: &ProviderMetrics) -> bool {
        metrics.is_available && metrics.error_count_window < self.config.serving_error_threshold
    }

    fn select_locked(
        &self,
        state: &mut RouterState,
        request: &GenerationRequest,
        excluded: &HashSet<ProviderId>,
    ) -> Option<(ProviderId, Arc<dyn Provider>)> {
        let RouterState {
            providers,
            order,
            strategy,
        } = state;
        let providers = &*providers;

        let candidates: Vec<Candidate<'_>> = order
            .iter()
            .filter(|id| !excluded.contains(id))
            .filter_map(|id| providers.get(id).map(|r| (id, r)))
            .filter(|(_, r)| self.is_candidate(&r.metrics))
            .map(|(id, r)| Candidate {
                id: *id,
                provider: r.provider.as_ref(),
                metrics: &r.metrics,
            })
            .collect();

        let chosen = match candidates.as_slice() {
            [] => return None,
            [only] => only.id,
            _ => strategy.select(&candidates, request)?,
        };
        debug!(
            strategy = %strategy.kind(),
            provider = %chosen,
            candidates = candidates.len(),
            "provider selected"
        );

        providers
            .get(&chosen)
            .map(|r| (chosen, Arc::clone(&r.provider)))
    }

    // ─────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────

    /// Route a request using the configured retry budget.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, RouterError> {
        self.generate_with_retries(request, self.config.max_retries)
            .await
    }

    /// Route a request with up to `max_retries` attempts (0 counts as 1).
    ///
    /// A provider that rejects credentials or quota is not tried again
    /// within the same call.
    pub async fn generate_with_retries(
        &self,
        request: &GenerationRequest,
        max_retries: u32,
    ) -> Result<GenerationResponse, RouterError> {
        let budget = max_retries.max(1);
        let mut excluded: HashSet<ProviderId> = HashSet::new();
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=budget {
            let selected = {
                let mut state = self.lock();
                self.select_locked(&mut state, request, &excluded)
            };
            let Some((id, provider)) = selected else {
                warn!(attempt, "no providers available");
                return Err(RouterError::NoProvidersAvailable);
            };

            match provider.generate(request).await {
                Ok(response) => {
                    self.record_success(id, &response);
                    debug!(
                        provider = %id,
                        attempt,
                        cost = response.cost,
                        latency_ms = response.response_time.as_millis() as u64,
                        "generation succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = %id, attempt, budget, error = %e, "generation attempt failed");
                    self.record_failure(id, &e);
                    if !e.is_transient() {
                        excluded.insert(id);
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => {
                error!(attempts = budget, error = %last, "all generation attempts failed");
                Err(RouterError::RetriesExhausted {
                    attempts: budget,
                    last,
                })
            }
            None => Err(RouterError::NoProvidersAvailable),
        }
    }

    fn record_success(&self, id: ProviderId, response: &GenerationResponse) {
        let mut state = self.lock();
        if let Some(metrics) = state.metrics_mut(id) {
            metrics.record(response, true);
        }
    }

    fn record_failure(&self, id: ProviderId, err: &ProviderError) {
        let threshold = self.config.quarantine_threshold;
        let mut state = self.lock();
        // Removed while the call was in flight
        let Some(metrics) = state.metrics_mut(id) else {
            return;
        };

        metrics.record(&GenerationResponse::placeholder(id), false);
        metrics.record_error(err);

        if metrics.is_available && metrics.error_count_window >= threshold {
            metrics.is_available = false;
            warn!(
                provider = %id,
                errors = metrics.error_count_window,
                "provider quarantined"
            );
        }
    }

    // ─────────────────────────────────────────────
    // Health and maintenance
    // ─────────────────────────────────────────────

    /// Probe every provider concurrently and set availability from the result.
    ///
    /// Each probe is bounded by `health_check_timeout_secs`; a timeout counts
    /// as unhealthy. Error windows are not touched.
    pub async fn health_check_all(&self) -> BTreeMap<ProviderId, HealthReport> {
        let targets: Vec<(ProviderId, Arc<dyn Provider>)> = {
            let state = self.lock();
            state
                .order
                .iter()
                .filter_map(|id| state.providers.get(id).map(|r| (*id, Arc::clone(&r.provider))))
                .collect()
        };
        let timeout = Duration::from_secs(self.config.health_check_timeout_secs);

        let probed: Vec<ProviderId> = targets.iter().map(|(id, _)| *id).collect();
        let mut set = JoinSet::new();
        for (id, provider) in targets {
            set.spawn(async move {
                match tokio::time::timeout(timeout, provider.health_check()).await {
                    Ok(report) => report,
                    Err(_) => HealthReport::unhealthy(
                        id,
                        timeout,
                        format!("health check timed out after {}s", timeout.as_secs()),
                    ),
                }
            });
        }

        let mut reports = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => {
                    reports.insert(report.provider, report);
                }
                Err(e) => error!(error = %e, "health check task failed"),
            }
        }
        // A probe that panicked or was cancelled left no report.
        for id in probed {
            reports.entry(id).or_insert_with(|| {
                HealthReport::unhealthy(id, Duration::ZERO, "health check task failed")
            });
        }

        let mut state = self.lock();
        for (id, report) in &reports {
            if let Some(metrics) = state.metrics_mut(*id) {
                metrics.is_available = report.is_healthy();
            }
            info!(
                provider = %id,
                status = ?report.status,
                latency_ms = report.latency.as_millis() as u64,
                "health check"
            );
        }

        reports
    }

    /// Zero every provider's error window. Availability is left as is.
    pub fn reset_error_counts(&self) {
        let mut state = self.lock();
        for registered in state.providers.values_mut() {
            registered.metrics.reset_window();
        }
        info!(providers = state.providers.len(), "error counts reset");
    }

    // ─────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────

    pub fn get_stats(&self) -> RouterStats {
        let state = self.lock();
        let providers: Vec<MetricsSnapshot> = state
            .order
            .iter()
            .filter_map(|id| state.providers.get(id))
            .map(|r| r.metrics.snapshot())
            .collect();

        RouterStats {
            strategy: state.strategy.kind(),
            provider_count: providers.len(),
            available_count: providers.iter().filter(|m| m.is_available).count(),
            total_requests: providers.iter().map(|m| m.total_requests).sum(),
            total_cost: providers.iter().map(|m| m.total_cost).sum(),
            providers,
        }
    }

    /// Per-provider cost projection for display; estimate failures read as 0.
    pub fn estimate_total_cost(&self, request: &GenerationRequest) -> BTreeMap<ProviderId, f64> {
        let state = self.lock();
        state
            .providers
            .iter()
            .map(|(id, r)| {
                let cost = r.provider.estimate_cost(request).unwrap_or_else(|e| {
                    debug!(provider = %id, error = %e, "cost estimate unavailable");
                    0.0
                });
                (*id, cost)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
