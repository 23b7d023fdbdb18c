//! Switchboard Router: picks a provider for every request.
//!
//! This crate contains:
//! - **metrics**: rolling per-provider statistics
//! - **strategy**: the selection algorithms (priority, cost, quality, balanced, …)
//! - **router**: registry, retry/failover loop, quarantine, health sweeps, stats
//! - **maintenance**: optional periodic scheduler for error-count resets and health sweeps

pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod router;
pub mod strategy;

pub use error::RouterError;
pub use maintenance::MaintenanceService;
pub use metrics::{MetricsSnapshot, ProviderMetrics};
pub use router::{Router, RouterStats};
pub use strategy::{Candidate, Strategy};
pub use switchboard_core::config::StrategyKind;
