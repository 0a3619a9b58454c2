//! The adapter seam between the orchestrator and an inference engine.

use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{ModelContext, ModelRole, Result};

/// A local language model that turns a context into raw text.
///
/// Errors are `ModelUnavailable`, `GenerationTimeout` or `Generation`.
/// Decoding parameters are the adapter's own business.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Which role this adapter plays.
    fn role(&self) -> ModelRole;

    /// Generate a raw completion for the given context.
    async fn generate(&self, context: &ModelContext) -> Result<String>;

    /// Whether the engine is loaded and accepting requests.
    async fn is_ready(&self) -> bool;

    /// Human-readable identifier used in logs.
    fn name(&self) -> String {
        self.role().to_string()
    }
}

pub type SharedAdapter = Arc<dyn ModelAdapter>;
