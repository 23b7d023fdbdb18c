//! Provider layer for Switchboard.
//!
//! The router never talks to a backend directly; it goes through the
//! [`Provider`] capability trait defined here.
//!
//! # Architecture
//!
//! - [`traits::Provider`]: trait every backend implements
//! - [`error::ProviderError`]: failure taxonomy (rate limit, quota, auth, …)
//! - [`pricing`]: static per-provider token prices + cost projection
//! - [`mock::MockProvider`]: scriptable in-process backend for tests and simulation

pub mod error;
pub mod mock;
pub mod pricing;
pub mod traits;

// Re-export main types for convenience
pub use error::{ProviderError, ProviderErrorKind};
pub use mock::MockProvider;
pub use pricing::{cost_for_usage, estimate_cost_from_pricing, PricingSpec, PRICING};
pub use traits::{default_health_check, HealthReport, HealthStatus, Provider};
