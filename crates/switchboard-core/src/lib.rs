//! Switchboard Core: shared types, configuration, and utilities.
//!
//! - **types**: provider identity plus the request/response pair every provider speaks
//! - **config**: on-disk JSON config with env var overrides
//! - **utils**: data paths and timestamps

pub mod config;
pub mod types;
pub mod utils;

pub use config::Config;
pub use types::{GenerationRequest, GenerationResponse, ProviderId, TokenUsage};
