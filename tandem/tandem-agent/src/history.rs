//! Conversation history and code-action log.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tandem_core::{CodeAction, CodeMemory, CodeVerdict, Result, TandemError, Turn};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Append-only store for turns and code actions.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a turn to the conversation
    async fn append_turn(&self, turn: Turn) -> Result<()>;

    /// The last `limit` turns, oldest first
    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>>;

    /// Every stored turn, oldest first
    async fn all_turns(&self) -> Result<Vec<Turn>>;

    /// Forget the conversation (user-initiated only)
    async fn clear_turns(&self) -> Result<()>;

    /// Record an accept, reject or save
    async fn append_action(&self, action: CodeAction) -> Result<()>;

    /// Every recorded action, oldest first
    async fn actions(&self) -> Result<Vec<CodeAction>>;
}

/// Rebuild the last accepted and rejected code from an action log.
pub fn code_memory_from_actions(actions: &[CodeAction]) -> CodeMemory {
    let mut memory = CodeMemory::default();
    for action in actions {
        match action.verdict {
            CodeVerdict::Accepted | CodeVerdict::Saved => {
                memory.last_accepted = Some(action.code.clone())
            }
            CodeVerdict::Rejected => memory.last_rejected = Some(action.code.clone()),
        }
    }
    memory
}

fn tail(turns: &[Turn], limit: usize) -> Vec<Turn> {
    turns[turns.len().saturating_sub(limit)..].to_vec()
}

/// In-process store, lost on exit.
#[derive(Default)]
pub struct MemoryHistoryStore {
    turns: RwLock<Vec<Turn>>,
    actions: RwLock<Vec<CodeAction>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_turn(&self, turn: Turn) -> Result<()> {
        self.turns.write().push(turn);
        Ok(())
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>> {
        Ok(tail(&self.turns.read(), limit))
    }

    async fn all_turns(&self) -> Result<Vec<Turn>> {
        Ok(self.turns.read().clone())
    }

    async fn clear_turns(&self) -> Result<()> {
        self.turns.write().clear();
        Ok(())
    }

    async fn append_action(&self, action: CodeAction) -> Result<()> {
        self.actions.write().push(action);
        Ok(())
    }

    async fn actions(&self) -> Result<Vec<CodeAction>> {
        Ok(self.actions.read().clone())
    }
}

#[derive(Default)]
struct JsonState {
    turns: Vec<Turn>,
    actions: Vec<CodeAction>,
}

/// Turns kept by a [`JsonHistoryStore`] unless told otherwise.
pub const DEFAULT_MAX_TURNS: usize = 1000;

/// File-backed store: an ordered JSON list of turns plus a separate list of
/// code actions. Every append rewrites the file through a temp file + rename.
///
/// Both lists are capped at `max_turns`; the oldest records go first.
pub struct JsonHistoryStore {
    history_path: PathBuf,
    actions_path: PathBuf,
    max_turns: usize,
    state: Mutex<JsonState>,
}

impl JsonHistoryStore {
    /// Open the store, loading whatever the files already hold.
    pub async fn open(history_path: impl Into<PathBuf>, actions_path: impl Into<PathBuf>) -> Result<Self> {
        let history_path = history_path.into();
        let actions_path = actions_path.into();

        let turns: Vec<Turn> = load_list(&history_path).await?;
        let actions: Vec<CodeAction> = load_list(&actions_path).await?;

        info!(
            "Opened history at {} ({} turns, {} code actions)",
            history_path.display(),
            turns.len(),
            actions.len()
        );

        Ok(Self {
            history_path,
            actions_path,
            max_turns: DEFAULT_MAX_TURNS,
            state: Mutex::new(JsonState { turns, actions }),
        })
    }

    /// Cap the stored turns and actions. Loaded records over the cap are
    /// dropped from memory now and from disk on the next write.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        let state = self.state.get_mut();
        trim_oldest(&mut state.turns, self.max_turns);
        trim_oldest(&mut state.actions, self.max_turns);
        self
    }
}

fn trim_oldest<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
        debug!("Dropped {} oldest history records", excess);
    }
}

async fn load_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TandemError::storage(format!("Failed to read {}: {}", path.display(), e)))?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content)
        .map_err(|e| TandemError::storage(format!("Failed to parse {}: {}", path.display(), e)))
}

async fn write_list<T: serde::Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TandemError::storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
    }

    let content = serde_json::to_vec_pretty(items)?;
    let temp_path = path.with_extension("json.tmp");

    tokio::fs::write(&temp_path, content)
        .await
        .map_err(|e| TandemError::storage(format!("Failed to write {}: {}", temp_path.display(), e)))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| TandemError::storage(format!("Failed to rename {}: {}", temp_path.display(), e)))?;

    debug!("Wrote {} records to {}", items.len(), path.display());
    Ok(())
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn append_turn(&self, turn: Turn) -> Result<()> {
        let mut state = self.state.lock().await;
        state.turns.push(turn);
        trim_oldest(&mut state.turns, self.max_turns);
        write_list(&self.history_path, &state.turns).await
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>> {
        Ok(tail(&self.state.lock().await.turns, limit))
    }

    async fn all_turns(&self) -> Result<Vec<Turn>> {
        Ok(self.state.lock().await.turns.clone())
    }

    async fn clear_turns(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.turns.clear();
        write_list(&self.history_path, &state.turns).await
    }

    async fn append_action(&self, action: CodeAction) -> Result<()> {
        let mut state = self.state.lock().await;
        state.actions.push(action);
        trim_oldest(&mut state.actions, self.max_turns);
        write_list(&self.actions_path, &state.actions).await
    }

    async fn actions(&self) -> Result<Vec<CodeAction>> {
        Ok(self.state.lock().await.actions.clone())
    }
}
