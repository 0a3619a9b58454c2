//! Deterministic adapter that replays scripted replies.

use crate::adapter::ModelAdapter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tandem_core::{ModelContext, ModelRole, Result, TandemError};

type Responder = Box<dyn Fn(&ModelContext) -> Result<String> + Send + Sync>;

/// Adapter with canned output, an invocation counter and optional latency.
///
/// Queued replies are served first, then the responder if one is set, then
/// the default reply.
pub struct ScriptedAdapter {
    role: ModelRole,
    default_reply: Mutex<Result<String>>,
    queue: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    latency: Option<Duration>,
    ready: AtomicBool,
    calls: AtomicUsize,
    contexts: Mutex<Vec<ModelContext>>,
}

impl ScriptedAdapter {
    pub fn new(role: ModelRole, reply: impl Into<String>) -> Self {
        Self::with_result(role, Ok(reply.into()))
    }

    /// An adapter whose every call fails with `error`.
    pub fn failing(role: ModelRole, error: TandemError) -> Self {
        Self::with_result(role, Err(error))
    }

    /// An adapter that computes its reply from the context.
    pub fn with_responder<F>(role: ModelRole, responder: F) -> Self
    where
        F: Fn(&ModelContext) -> Result<String> + Send + Sync + 'static,
    {
        let mut adapter = Self::with_result(role, Ok(String::new()));
        adapter.responder = Some(Box::new(responder));
        adapter
    }

    fn with_result(role: ModelRole, reply: Result<String>) -> Self {
        Self {
            role,
            default_reply: Mutex::new(reply),
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            latency: None,
            ready: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_ready(self, ready: bool) -> Self {
        self.ready.store(ready, Ordering::SeqCst);
        self
    }

    /// Queue a one-shot reply served before the default.
    pub fn push_reply(&self, reply: Result<String>) {
        self.queue.lock().push_back(reply);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ModelContext> {
        self.contexts.lock().clone()
    }

    pub fn last_context(&self) -> Option<ModelContext> {
        self.contexts.lock().last().cloned()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn role(&self) -> ModelRole {
        self.role
    }

    async fn generate(&self, context: &ModelContext) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(reply) = self.queue.lock().pop_front() {
            return reply;
        }

        if let Some(responder) = &self.responder {
            return responder(context);
        }

        self.default_reply.lock().clone()
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn name(&self) -> String {
        format!("scripted-{}", self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::{CodeMemory, SamplingHint};

    fn ctx(prompt: &str) -> ModelContext {
        ModelContext {
            system_preamble: String::new(),
            history_window: Vec::new(),
            prompt: prompt.to_string(),
            target_model: ModelRole::Dialogue,
            code_memory: CodeMemory::default(),
            language_hint: None,
            sampling: SamplingHint::Balanced,
        }
    }

    #[tokio::test]
    async fn test_queue_before_default() {
        let adapter = ScriptedAdapter::new(ModelRole::Dialogue, "default");
        adapter.push_reply(Ok("first".into()));

        assert_eq!(adapter.generate(&ctx("a")).await.unwrap(), "first");
        assert_eq!(adapter.generate(&ctx("b")).await.unwrap(), "default");
        assert_eq!(adapter.calls(), 2);
        assert_eq!(adapter.last_context().unwrap().prompt, "b");
    }

    #[tokio::test]
    async fn test_failing_adapter() {
        let adapter = ScriptedAdapter::failing(
            ModelRole::Code,
            TandemError::model_unavailable(ModelRole::Code, "not loaded"),
        );
        let err = adapter.generate(&ctx("x")).await.unwrap_err();
        assert!(err.is_model_unavailable());
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_responder_sees_context() {
        let adapter = ScriptedAdapter::with_responder(ModelRole::Dialogue, |c| {
            Ok(format!("echo: {}", c.prompt))
        });
        assert_eq!(adapter.generate(&ctx("hi")).await.unwrap(), "echo: hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let adapter = ScriptedAdapter::new(ModelRole::Dialogue, "slow").with_latency(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        adapter.generate(&ctx("x")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_readiness_toggle() {
        let adapter = ScriptedAdapter::new(ModelRole::Code, "x").with_ready(false);
        assert!(!adapter.is_ready().await);
        adapter.set_ready(true);
        assert!(adapter.is_ready().await);
    }
}
