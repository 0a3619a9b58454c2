//! Model adapters for Tandem.
//!
//! Every inference engine is reached through the [`ModelAdapter`] trait, so the
//! orchestrator can drive the Dialogue and Code roles the same way:
//!
//! - [`LlamaServerAdapter`] talks to a llama.cpp-compatible server on this machine
//! - [`ScriptedAdapter`] replays canned replies for tests and offline runs

pub mod adapter;
pub mod llama;
pub mod render;
pub mod scripted;

pub use adapter::{ModelAdapter, SharedAdapter};
pub use llama::LlamaServerAdapter;
pub use render::render_prompt;
pub use scripted::ScriptedAdapter;
