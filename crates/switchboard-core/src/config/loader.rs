//! Config loader: reads `~/.switchboard/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.switchboard/config.json`
//! 3. Environment variables `SWITCHBOARD_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::schema::Config;
use crate::types::ProviderId;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `SWITCHBOARD_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `SWITCHBOARD_ROUTER__STRATEGY` → `router.strategy`
/// - `SWITCHBOARD_ROUTER__MAX_RETRIES` → `router.max_retries`
/// - `SWITCHBOARD_ROUTER__QUARANTINE_THRESHOLD` → `router.quarantine_threshold`
/// - `SWITCHBOARD_ROUTER__SERVING_ERROR_THRESHOLD` → `router.serving_error_threshold`
/// - `SWITCHBOARD_ROUTER__HEALTH_CHECK_TIMEOUT_SECS` → `router.health_check_timeout_secs`
/// - `SWITCHBOARD_ROUTER__AB_SPLIT` → `router.ab_split`
/// - `SWITCHBOARD_PROVIDERS__<NAME>__PRIORITY` / `__WEIGHT` / `__QUALITY_SCORE` / `__ENABLED`
/// - `SWITCHBOARD_MAINTENANCE__ENABLED` / `__RESET_INTERVAL_SECS` / `__HEALTH_CHECK_INTERVAL_SECS`
///
/// Values that fail to parse are ignored.
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, &|key| std::env::var(key).ok())
}

/// Variable lookup used by [`apply_overrides`]; `std::env::var` in production.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn apply_overrides(mut config: Config, lookup: Lookup<'_>) -> Config {
    let router = &mut config.router;
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_ROUTER__STRATEGY") {
        router.strategy = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_ROUTER__MAX_RETRIES") {
        router.max_retries = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_ROUTER__QUARANTINE_THRESHOLD") {
        router.quarantine_threshold = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_ROUTER__SERVING_ERROR_THRESHOLD") {
        router.serving_error_threshold = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_ROUTER__HEALTH_CHECK_TIMEOUT_SECS") {
        router.health_check_timeout_secs = v;
    }
    if let Some(v) = float_var(lookup, "SWITCHBOARD_ROUTER__AB_SPLIT") {
        router.ab_split = v.clamp(0.0, 1.0);
    }

    for id in ProviderId::ALL {
        apply_provider_overrides(&mut config, id, lookup);
    }

    let maintenance = &mut config.maintenance;
    if let Some(v) = bool_var(lookup, "SWITCHBOARD_MAINTENANCE__ENABLED") {
        maintenance.enabled = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_MAINTENANCE__RESET_INTERVAL_SECS") {
        maintenance.reset_interval_secs = v;
    }
    if let Some(v) = parse_var(lookup, "SWITCHBOARD_MAINTENANCE__HEALTH_CHECK_INTERVAL_SECS") {
        maintenance.health_check_interval_secs = v;
    }

    config
}

/// Apply overrides for a single provider.
///
/// Only touches the config when at least one variable is set, so unlisted
/// providers don't get default entries.
fn apply_provider_overrides(config: &mut Config, id: ProviderId, lookup: Lookup<'_>) {
    let prefix = format!("SWITCHBOARD_PROVIDERS__{}", id.as_str().to_uppercase());

    if let Some(v) = parse_var(lookup, &format!("{prefix}__PRIORITY")) {
        config.providers.entry(id).priority = v;
    }
    if let Some(v) = float_var(lookup, &format!("{prefix}__WEIGHT")) {
        config.providers.entry(id).weight = v;
    }
    if let Some(v) = float_var(lookup, &format!("{prefix}__QUALITY_SCORE")) {
        config.providers.entry(id).quality_score = v;
    }
    if let Some(v) = bool_var(lookup, &format!("{prefix}__ENABLED")) {
        config.providers.entry(id).enabled = v;
    }
}

fn parse_var<T: FromStr>(lookup: Lookup<'_>, key: &str) -> Option<T> {
    let val = lookup(key)?;
    match val.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %val, "Ignoring unparseable env override");
            None
        }
    }
}

/// Like [`parse_var`] but rejects NaN and infinities, which `f64::from_str` accepts.
fn float_var(lookup: Lookup<'_>, key: &str) -> Option<f64> {
    let v = parse_var::<f64>(lookup, key)?;
    if v.is_finite() {
        Some(v)
    } else {
        warn!(key, value = v, "Ignoring non-finite env override");
        None
    }
}

fn bool_var(lookup: Lookup<'_>, key: &str) -> Option<bool> {
    lookup(key).map(|v| v == "true" || v == "1")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
