//! The Hybrid Agent: routes a prompt to the Dialogue and/or Code model and
//! owns the cache lifecycle around it.

use crate::cache::ResponseCache;
use crate::classifier::{Classification, IntentClassifier};
use crate::context::ContextAssembler;
use crate::extractor::{extract, tidy_dialogue};
use crate::history::{HistoryStore, code_memory_from_actions};
use crate::saver::CodeSaver;
use crate::session::{SessionClock, Ticket};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_core::config::ContextConfig;
use tandem_core::{
    CacheEntry, CodeAction, CodeKind, CodeMemory, CodeVerdict, GenerationRequest,
    GenerationResult, Intent, ModelContext, ModelRole, NormalizedKey, Prompt, Result,
    TandemConfig, TandemError, Turn,
};
use tandem_models::SharedAdapter;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Runtime knobs for [`HybridAgent`].
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub dialogue_timeout: Duration,
    pub code_timeout: Duration,
    pub context: ContextConfig,
    pub saved_code_dir: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            dialogue_timeout: Duration::from_secs(120),
            code_timeout: Duration::from_secs(120),
            context: ContextConfig::default(),
            saved_code_dir: std::env::temp_dir().join("tandem-generated"),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &TandemConfig) -> Self {
        Self {
            dialogue_timeout: Duration::from_secs(config.models.dialogue.generation_timeout_secs),
            code_timeout: Duration::from_secs(config.models.code.generation_timeout_secs),
            context: config.context.clone(),
            saved_code_dir: config.saved_code_dir(),
        }
    }

    fn timeout_for(&self, role: ModelRole) -> Duration {
        match role {
            ModelRole::Dialogue => self.dialogue_timeout,
            ModelRole::Code => self.code_timeout,
        }
    }
}

/// Readiness of both models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub dialogue_online: bool,
    pub code_online: bool,
    /// True only when both models are ready
    pub ready: bool,
}

/// One model plus the lock that serializes its generations.
struct ModelSlot {
    adapter: SharedAdapter,
    turn: Mutex<()>,
}

impl ModelSlot {
    fn new(adapter: SharedAdapter) -> Self {
        Self {
            adapter,
            turn: Mutex::new(()),
        }
    }
}

/// Output of one generation before it is committed.
struct Generated {
    result: GenerationResult,
    /// One of two invoked models failed
    partial: bool,
}

/// Orchestrates classification, context assembly, generation and caching.
pub struct HybridAgent {
    dialogue: ModelSlot,
    code: ModelSlot,
    cache: Arc<ResponseCache>,
    history: Arc<dyn HistoryStore>,
    classifier: IntentClassifier,
    assembler: ContextAssembler,
    saver: CodeSaver,
    settings: AgentSettings,
    inflight: DashMap<NormalizedKey, Arc<Mutex<()>>>,
    clock: SessionClock,
    code_memory: RwLock<CodeMemory>,
}

impl HybridAgent {
    pub fn new(
        dialogue: SharedAdapter,
        code: SharedAdapter,
        cache: Arc<ResponseCache>,
        history: Arc<dyn HistoryStore>,
        settings: AgentSettings,
    ) -> Self {
        if dialogue.role() != ModelRole::Dialogue || code.role() != ModelRole::Code {
            warn!(
                "Adapter roles look swapped: dialogue slot has {}, code slot has {}",
                dialogue.role(),
                code.role()
            );
        }

        Self {
            dialogue: ModelSlot::new(dialogue),
            code: ModelSlot::new(code),
            cache,
            history,
            classifier: IntentClassifier::new(),
            assembler: ContextAssembler::new(settings.context.clone()),
            saver: CodeSaver::new(settings.saved_code_dir.clone()),
            settings,
            inflight: DashMap::new(),
            clock: SessionClock::new(),
            code_memory: RwLock::new(CodeMemory::default()),
        }
    }

    /// Rebuild the last accepted/rejected code from the stored action log.
    pub async fn restore_code_memory(&self) -> Result<()> {
        let actions = self.history.actions().await?;
        let memory = code_memory_from_actions(&actions);
        debug!(
            "Restored code memory from {} actions (accepted: {}, rejected: {})",
            actions.len(),
            memory.last_accepted.is_some(),
            memory.last_rejected.is_some()
        );
        *self.code_memory.write() = memory;
        Ok(())
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn code_memory(&self) -> CodeMemory {
        self.code_memory.read().clone()
    }

    /// Handle one chat message. Failures come back as a result with `error` set.
    pub async fn chat(&self, request: GenerationRequest) -> GenerationResult {
        match self.try_chat(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Chat failed ({}): {}", e.kind(), e);
                GenerationResult::failure(e.to_string())
            }
        }
    }

    /// Handle one chat message, surfacing failures as [`TandemError`].
    pub async fn try_chat(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let prompt = Prompt::parse(&request.message)?;
        let key = prompt.key();
        let ticket = self.clock.arrive(&key);
        debug!(key = %key, force_new = request.force_new, "Classifying");

        if !request.force_new {
            if let Some(entry) = self.cache.get(&key).await {
                return Ok(self.serve_cached(&prompt, &key, entry).await);
            }
        }

        let gate = self.inflight.entry(key.clone()).or_default().clone();
        let outcome = {
            let _guard = gate.lock().await;
            self.generate_under_gate(&prompt, &key, ticket, request.force_new)
                .await
        };

        // The map and `gate` hold the only references when nobody is waiting
        self.inflight
            .remove_if(&key, |_, lock| Arc::strong_count(lock) <= 2);

        outcome
    }

    async fn generate_under_gate(
        &self,
        prompt: &Prompt,
        key: &NormalizedKey,
        ticket: Ticket,
        force_new: bool,
    ) -> Result<GenerationResult> {
        // A request that waited behind an identical one serves its result
        if !force_new {
            if let Some(entry) = self.cache.get(key).await {
                return Ok(self.serve_cached(prompt, key, entry).await);
            }
        }

        let generated = self.generate(prompt, key).await?;

        if self.clock.is_superseded(ticket, key) {
            debug!(key = %key, "Superseded by a newer prompt, result not stored");
            return Ok(generated.result);
        }

        if generated.partial {
            debug!(key = %key, "Partial result, not cached");
        } else {
            let result = &generated.result;
            let entry = CacheEntry::new(
                key.clone(),
                result.text.clone(),
                result.code.clone(),
                result.code_kind,
            );
            self.cache.put(key.clone(), entry).await;
            debug!(key = %key, "Cached");
        }

        self.append_exchange(prompt, &generated.result).await;
        Ok(generated.result)
    }

    async fn serve_cached(
        &self,
        prompt: &Prompt,
        key: &NormalizedKey,
        entry: CacheEntry,
    ) -> GenerationResult {
        debug!(key = %key, "Cache hit");
        let result = entry.to_result();
        self.append_exchange(prompt, &result).await;
        result
    }

    async fn generate(&self, prompt: &Prompt, key: &NormalizedKey) -> Result<Generated> {
        let recent = match self
            .history
            .recent_turns(self.settings.context.history_turns)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                warn!("Could not load history, continuing without it: {}", e);
                Vec::new()
            }
        };

        let classification = self.classifier.classify(prompt.as_str(), &recent);
        debug!(
            key = %key,
            intent = %classification.intent,
            language = ?classification.language_hint,
            "Generating"
        );

        let memory = self.code_memory();
        let context_for = |role: ModelRole| {
            self.assembler
                .assemble(role, prompt.as_str(), &recent, &classification, &memory)
        };
        let dialogue_ctx = classification
            .intent
            .wants_dialogue()
            .then(|| context_for(ModelRole::Dialogue));
        let code_ctx = classification
            .intent
            .wants_code()
            .then(|| context_for(ModelRole::Code));

        let (dialogue_out, code_out) = tokio::join!(
            self.run_optional(ModelRole::Dialogue, dialogue_ctx.as_ref()),
            self.run_optional(ModelRole::Code, code_ctx.as_ref()),
        );

        debug!(key = %key, "Extracting");
        compose(&classification, dialogue_out, code_out)
    }

    async fn run_optional(
        &self,
        role: ModelRole,
        context: Option<&ModelContext>,
    ) -> Option<Result<String>> {
        match context {
            Some(context) => Some(self.run_model(role, context).await),
            None => None,
        }
    }

    async fn run_model(&self, role: ModelRole, context: &ModelContext) -> Result<String> {
        let slot = match role {
            ModelRole::Dialogue => &self.dialogue,
            ModelRole::Code => &self.code,
        };
        let limit = self.settings.timeout_for(role);

        let _turn = slot.turn.lock().await;
        let started = Instant::now();

        match tokio::time::timeout(limit, slot.adapter.generate(context)).await {
            Ok(Ok(output)) => {
                info!(
                    "{} produced {} chars in {}ms",
                    slot.adapter.name(),
                    output.chars().count(),
                    started.elapsed().as_millis()
                );
                Ok(output)
            }
            Ok(Err(e)) => {
                warn!("{} failed: {}", slot.adapter.name(), e);
                Err(e)
            }
            Err(_) => {
                warn!("{} model timed out after {}s", role, limit.as_secs());
                Err(TandemError::timeout(role, limit.as_secs()))
            }
        }
    }

    async fn append_exchange(&self, prompt: &Prompt, result: &GenerationResult) {
        let turns = [
            Turn::user(prompt.as_str()),
            Turn::assistant(result.text.clone(), result.code.clone(), result.code_kind),
        ];
        for turn in turns {
            if let Err(e) = self.history.append_turn(turn).await {
                warn!("Failed to append history: {}", e);
            }
        }
    }

    async fn record_action(&self, action: CodeAction) {
        if let Err(e) = self.history.append_action(action).await {
            warn!("Failed to record code action: {}", e);
        }
    }

    /// Reject the cached answer for `prompt`. Returns whether an entry existed.
    pub async fn clear_prompt_cache(&self, prompt: &str) -> Result<bool> {
        let prompt = Prompt::parse(prompt)?;
        let key = prompt.key();
        let Some(entry) = self.cache.invalidate(&key).await else {
            debug!(key = %key, "Nothing cached to invalidate");
            return Ok(false);
        };

        info!("Invalidated cached answer for '{}'", key);
        if let Some(code) = entry.code {
            self.code_memory.write().last_rejected = Some(code.clone());
            let action = CodeAction::new(CodeVerdict::Rejected, code)
                .with_prompt(prompt.as_str())
                .with_code_kind(entry.code_kind);
            self.record_action(action).await;
        }
        Ok(true)
    }

    /// Write accepted code to disk and remember it as accepted.
    pub async fn save_code(&self, code: &str, filename: Option<&str>) -> Result<PathBuf> {
        let path = self.saver.save(code, filename).await?;

        self.code_memory.write().last_accepted = Some(code.to_string());
        let action = CodeAction::new(CodeVerdict::Saved, code)
            .with_code_kind(kind_from_path(&path))
            .with_file_path(path.display().to_string());
        self.record_action(action).await;

        Ok(path)
    }

    /// Explicit accept/reject from the UI.
    pub async fn record_feedback(
        &self,
        verdict: CodeVerdict,
        prompt: Option<&str>,
        code: &str,
    ) -> Result<()> {
        if code.trim().is_empty() {
            return Err(TandemError::invalid_input("no code to give feedback on"));
        }

        {
            let mut memory = self.code_memory.write();
            match verdict {
                CodeVerdict::Accepted | CodeVerdict::Saved => {
                    memory.last_accepted = Some(code.to_string())
                }
                CodeVerdict::Rejected => memory.last_rejected = Some(code.to_string()),
            }
        }

        let mut action = CodeAction::new(verdict, code);
        if let Some(prompt) = prompt.map(str::trim).filter(|p| !p.is_empty()) {
            action = action.with_prompt(prompt);
        }
        debug!("Recording {} feedback", verdict.as_str());
        self.record_action(action).await;
        Ok(())
    }

    pub async fn status(&self) -> StatusReport {
        let (dialogue_online, code_online) = tokio::join!(
            self.dialogue.adapter.is_ready(),
            self.code.adapter.is_ready()
        );
        StatusReport {
            dialogue_online,
            code_online,
            ready: dialogue_online && code_online,
        }
    }

    pub async fn history(&self) -> Result<Vec<Turn>> {
        self.history.all_turns().await
    }

    /// Forget the conversation. Cached answers are kept.
    pub async fn clear_history(&self) -> Result<()> {
        info!("Clearing conversation history");
        self.history.clear_turns().await
    }
}

/// Combine model outputs according to the intent and the partial-success policy.
fn compose(
    classification: &Classification,
    dialogue_out: Option<Result<String>>,
    code_out: Option<Result<String>>,
) -> Result<Generated> {
    let invoked = dialogue_out.is_some() as usize + code_out.is_some() as usize;
    let mut errors = Vec::new();

    let dialogue = match dialogue_out {
        Some(Ok(raw)) => Some(raw),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None => None,
    };
    let code = match code_out {
        Some(Ok(raw)) => Some(raw),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None => None,
    };

    if errors.len() == invoked {
        return Err(errors.remove(0));
    }

    let mut text = dialogue.as_deref().map(tidy_dialogue).unwrap_or_default();
    let mut extracted = None;

    if let Some(raw) = code {
        let extraction = extract(&raw, classification.intent, classification.language_hint);
        if classification.intent == Intent::CodeOnly {
            text = extraction.prose;
        }
        extracted = extraction.code;
    }

    let (code, code_kind) = match extracted {
        Some(found) => (Some(found.code), Some(found.kind)),
        None => (None, None),
    };

    Ok(Generated {
        result: GenerationResult::success(text, code, code_kind),
        partial: !errors.is_empty(),
    })
}

fn kind_from_path(path: &std::path::Path) -> Option<CodeKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| *ext != "txt")
        .and_then(CodeKind::from_tag)
}
