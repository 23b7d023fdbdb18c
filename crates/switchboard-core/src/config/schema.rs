//! Configuration schema.
//!
//! Hierarchy: `Config` → `RouterConfig`, `ProvidersConfig`, `MaintenanceConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Every struct is `#[serde(default)]`, so a partial file is always valid.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ProviderId;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.switchboard/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub router: RouterConfig,
    pub providers: ProvidersConfig,
    pub maintenance: MaintenanceConfig,
}

// ─────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────

/// Selection strategy name, as it appears in config and on the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Priority,
    CostOptimized,
    QualityOptimized,
    Balanced,
    RoundRobin,
    AbTest,
    Weighted,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::Priority,
        StrategyKind::CostOptimized,
        StrategyKind::QualityOptimized,
        StrategyKind::Balanced,
        StrategyKind::RoundRobin,
        StrategyKind::AbTest,
        StrategyKind::Weighted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Priority => "priority",
            StrategyKind::CostOptimized => "cost_optimized",
            StrategyKind::QualityOptimized => "quality_optimized",
            StrategyKind::Balanced => "balanced",
            StrategyKind::RoundRobin => "round_robin",
            StrategyKind::AbTest => "ab_test",
            StrategyKind::Weighted => "weighted",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    /// Accepts both `round_robin` and `round-robin`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Router behaviour: strategy, retry budget, and the two error thresholds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterConfig {
    /// Active selection strategy.
    pub strategy: StrategyKind,
    /// Attempts per `generate` call (0 is treated as 1).
    pub max_retries: u32,
    /// Failures in the current window that flip a provider to unavailable.
    pub quarantine_threshold: u32,
    /// Failures in the current window at which a provider stops being a candidate.
    pub serving_error_threshold: u32,
    /// Per-provider timeout for a health check probe.
    pub health_check_timeout_secs: u64,
    /// Probability of routing to group A in A/B tests (0.0 – 1.0).
    pub ab_split: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Priority,
            max_retries: 3,
            quarantine_threshold: 3,
            serving_error_threshold: 5,
            health_check_timeout_secs: 10,
            ab_split: 0.5,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Static tuning for one provider, applied when it is registered.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Lower value = preferred by the priority strategy.
    pub priority: i32,
    /// Relative share for weighted selection (≥ 0).
    pub weight: f64,
    /// Historical output quality in [0, 1].
    pub quality_score: f64,
    /// Disabled providers are skipped by the CLI simulator and `status`.
    pub enabled: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            priority: 1,
            weight: 1.0,
            quality_score: 0.8,
            enabled: true,
        }
    }
}

impl ProviderSettings {
    /// Clamp weight and quality into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.weight = self.weight.max(0.0);
        self.quality_score = self.quality_score.clamp(0.0, 1.0);
        self
    }
}

/// Per-provider settings keyed by provider id.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ProvidersConfig(pub BTreeMap<ProviderId, ProviderSettings>);

impl ProvidersConfig {
    /// Settings for `id`, or defaults if the provider is not listed.
    pub fn settings_for(&self, id: ProviderId) -> ProviderSettings {
        self.0.get(&id).cloned().unwrap_or_default().normalized()
    }

    /// Mutable settings for `id`, inserting defaults if missing.
    pub fn entry(&mut self, id: ProviderId) -> &mut ProviderSettings {
        self.0.entry(id).or_default()
    }

    /// Enabled providers, in id order.
    pub fn enabled(&self) -> impl Iterator<Item = (ProviderId, &ProviderSettings)> {
        self.0.iter().filter(|(_, s)| s.enabled).map(|(id, s)| (*id, s))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─────────────────────────────────────────────
// Maintenance
// ─────────────────────────────────────────────

/// Periodic upkeep run by the maintenance service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    /// Seconds between `reset_error_counts` calls.
    pub reset_interval_secs: u64,
    /// Seconds between health sweeps (0 = never).
    pub health_check_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            reset_interval_secs: 60 * 60,
            health_check_interval_secs: 0,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
