//! Building the agent and its collaborators from a [`TandemConfig`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tandem_agent::{AgentSettings, HistoryStore, HybridAgent, JsonHistoryStore, MemoryHistoryStore, ResponseCache};
use tandem_core::{ModelRole, TandemConfig};
use tandem_models::{LlamaServerAdapter, SharedAdapter};
use tracing::{info, warn};

/// Create the llama-server adapters, cache and history store and hand them
/// to a new [`HybridAgent`].
pub async fn build_agent(config: &TandemConfig) -> Result<Arc<HybridAgent>> {
    config
        .ensure_directories()
        .await
        .context("Failed to create data directories")?;

    let dialogue: SharedAdapter = Arc::new(
        LlamaServerAdapter::new(ModelRole::Dialogue, config.models.dialogue.clone())
            .context("Invalid dialogue model configuration")?,
    );
    let code: SharedAdapter = Arc::new(
        LlamaServerAdapter::new(ModelRole::Code, config.models.code.clone())
            .context("Invalid code model configuration")?,
    );

    let history: Arc<dyn HistoryStore> = if config.storage.persist_history {
        Arc::new(
            JsonHistoryStore::open(config.history_path(), config.actions_path())
                .await
                .context("Failed to open history store")?
                .with_max_turns(config.storage.max_history_turns),
        )
    } else {
        info!("History persistence disabled, keeping history in memory");
        Arc::new(MemoryHistoryStore::new())
    };

    let cache = Arc::new(ResponseCache::from_config(&config.cache));
    let agent = HybridAgent::new(
        dialogue,
        code,
        cache,
        history,
        AgentSettings::from_config(config),
    );

    if let Err(e) = agent.restore_code_memory().await {
        warn!("Could not restore code memory: {}", e);
    }

    info!(
        "Agent ready (dialogue: {}, code: {})",
        config.models.dialogue.endpoint, config.models.code.endpoint
    );
    Ok(Arc::new(agent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_agent_creates_storage() {
        let dir = TempDir::new().unwrap();
        let mut config = TandemConfig::default();
        config.storage.data_dir = dir.path().join("data");

        let agent = build_agent(&config).await.unwrap();

        assert!(config.saved_code_dir().exists());
        assert!(agent.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_agent_rejects_remote_endpoint() {
        let dir = TempDir::new().unwrap();
        let mut config = TandemConfig::default();
        config.storage.data_dir = dir.path().join("data");
        config.models.code.endpoint = "http://example.com:8082".to_string();

        assert!(build_agent(&config).await.is_err());
    }
}
