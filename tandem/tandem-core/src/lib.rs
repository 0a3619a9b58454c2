//! Core types and abstractions for the Tandem hybrid assistant.
//!
//! This crate provides the data model, prompt normalization, configuration
//! and error handling shared by the model adapters, the orchestrator and the
//! HTTP boundary.

pub mod config;
pub mod error;
pub mod prompt;
pub mod types;

pub use config::TandemConfig;
pub use error::{Result, TandemError};
pub use prompt::{MAX_PROMPT_CHARS, NormalizedKey, Prompt};
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::TandemConfig;
    pub use crate::error::{Result, TandemError};
    pub use crate::prompt::{MAX_PROMPT_CHARS, NormalizedKey, Prompt};
    pub use crate::types::*;
}
