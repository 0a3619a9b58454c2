//! Tandem - local hybrid AI IDE backend.
//!
//! - `api` - axum router exposing chat, cache, status and code endpoints
//! - `bootstrap` - wiring a [`HybridAgent`](tandem_agent::HybridAgent) from configuration

pub mod api;
pub mod bootstrap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
