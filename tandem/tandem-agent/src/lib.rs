//! Hybrid Agent orchestration for Tandem.
//!
//! The [`HybridAgent`] turns a chat message into a [`GenerationResult`]:
//!
//! 1. normalize the prompt and consult the [`ResponseCache`]
//! 2. classify the intent with the [`IntentClassifier`]
//! 3. assemble per-model contexts with the [`ContextAssembler`]
//! 4. run the Dialogue and/or Code adapters under per-role locks and timeouts
//! 5. extract code from the output and store the result
//!
//! [`GenerationResult`]: tandem_core::GenerationResult

pub mod cache;
pub mod classifier;
pub mod context;
pub mod extractor;
pub mod history;
pub mod orchestrator;
pub mod saver;
pub mod session;

pub use cache::ResponseCache;
pub use classifier::{Classification, IntentClassifier, looks_like_code};
pub use context::{ContextAssembler, detect_reply_language, detect_sampling};
pub use extractor::{CodeIssue, ExtractedCode, Extraction, extract, tidy_dialogue, validate};
pub use history::{HistoryStore, JsonHistoryStore, MemoryHistoryStore, code_memory_from_actions};
pub use orchestrator::{AgentSettings, HybridAgent, StatusReport};
pub use saver::{CodeSaver, MAX_CODE_CHARS, sanitize_filename};
pub use session::{SessionClock, Ticket};
