//! Boundary validation and cache-key normalization for user prompts.

use crate::error::{Result, TandemError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest prompt accepted at the boundary, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// A validated user prompt.
///
/// Control characters other than newline and tab are stripped, and the
/// surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    /// Sanitize and validate raw user input.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned = strip_controls(raw);
        let text = cleaned.trim();

        if text.is_empty() {
            return Err(TandemError::invalid_input("message is empty"));
        }

        let len = text.chars().count();
        if len > MAX_PROMPT_CHARS {
            return Err(TandemError::invalid_input(format!(
                "message is {} characters long, the limit is {}",
                len, MAX_PROMPT_CHARS
            )));
        }

        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn key(&self) -> NormalizedKey {
        NormalizedKey(canonicalize(&self.text))
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Case-folded, whitespace-collapsed form of a prompt used as cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Normalize raw text the same way [`Prompt::parse`] cleans it, so a raw
    /// prompt and its parsed form always map to one key. Fails on empty or
    /// whitespace-only input.
    pub fn normalize(raw: &str) -> Result<Self> {
        let key = canonicalize(&strip_controls(raw));
        if key.is_empty() {
            return Err(TandemError::invalid_input("message is empty"));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_controls(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn canonicalize(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
