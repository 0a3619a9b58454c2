//! Shared data model for requests, turns, cache entries and model contexts.

use crate::prompt::NormalizedKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of the two engines a context or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Dialogue,
    Code,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Programming language of a generated code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Python,
    JavaScript,
    TypeScript,
    Html,
    Css,
    Java,
    Cpp,
    C,
    CSharp,
    Rust,
    Go,
    Bash,
    Sql,
    Json,
    Ruby,
    Php,
    Kotlin,
    Swift,
}

impl CodeKind {
    pub const ALL: [CodeKind; 18] = [
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Html,
        Self::Css,
        Self::Java,
        Self::Cpp,
        Self::C,
        Self::CSharp,
        Self::Rust,
        Self::Go,
        Self::Bash,
        Self::Sql,
        Self::Json,
        Self::Ruby,
        Self::Php,
        Self::Kotlin,
        Self::Swift,
    ];

    /// Lowercase name as reported in `code_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Html => "html",
            Self::Css => "css",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::CSharp => "csharp",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Bash => "bash",
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
        }
    }

    /// Resolve a fence tag or language name, accepting common aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let kind = match tag.as_str() {
            "python" | "py" | "python3" => Self::Python,
            "javascript" | "js" | "node" | "jsx" => Self::JavaScript,
            "typescript" | "ts" | "tsx" => Self::TypeScript,
            "html" | "htm" | "xhtml" => Self::Html,
            "css" => Self::Css,
            "java" => Self::Java,
            "cpp" | "c++" | "cxx" | "cc" => Self::Cpp,
            "c" | "h" => Self::C,
            "csharp" | "c#" | "cs" => Self::CSharp,
            "rust" | "rs" => Self::Rust,
            "go" | "golang" => Self::Go,
            "bash" | "sh" | "shell" | "zsh" => Self::Bash,
            "sql" => Self::Sql,
            "json" => Self::Json,
            "ruby" | "rb" => Self::Ruby,
            "php" => Self::Php,
            "kotlin" | "kt" => Self::Kotlin,
            "swift" => Self::Swift,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    #[serde(rename = "content")]
    pub text: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "code_type", skip_serializing_if = "Option::is_none")]
    pub code_kind: Option<CodeKind>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            role: Role::User,
            text: text.into(),
            code: None,
            code_kind: None,
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        code: Option<String>,
        code_kind: Option<CodeKind>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            role: Role::Assistant,
            text: text.into(),
            code,
            code_kind,
        }
    }

    pub fn has_code(&self) -> bool {
        self.code.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// Which models a request should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DialogueOnly,
    CodeOnly,
    Both,
}

impl Intent {
    pub fn wants_dialogue(&self) -> bool {
        matches!(self, Self::DialogueOnly | Self::Both)
    }

    pub fn wants_code(&self) -> bool {
        matches!(self, Self::CodeOnly | Self::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DialogueOnly => "dialogue_only",
            Self::CodeOnly => "code_only",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A memoized, successful generation for one normalized prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: NormalizedKey,
    pub result_text: String,
    pub code: Option<String>,
    pub code_kind: Option<CodeKind>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        key: NormalizedKey,
        result_text: impl Into<String>,
        code: Option<String>,
        code_kind: Option<CodeKind>,
    ) -> Self {
        Self {
            key,
            result_text: result_text.into(),
            code,
            code_kind,
            created_at: Utc::now(),
        }
    }

    pub fn to_result(&self) -> GenerationResult {
        GenerationResult::success(self.result_text.clone(), self.code.clone(), self.code_kind)
    }
}

/// An incoming chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub message: String,
    #[serde(default)]
    pub force_new: bool,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            force_new: false,
        }
    }

    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }
}

/// Outcome of one chat request.
///
/// Either `text` carries the reply or `error` explains the failure. `code` is
/// independent of both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub code: Option<String>,
    pub code_kind: Option<CodeKind>,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn success(text: impl Into<String>, code: Option<String>, code_kind: Option<CodeKind>) -> Self {
        Self {
            text: text.into(),
            code,
            code_kind,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Decoding temperament requested by the prompt wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingHint {
    Creative,
    Precise,
    #[default]
    Balanced,
}

/// Language the dialogue model should answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyLanguage {
    #[serde(rename = "pt-BR")]
    PortugueseBr,
    #[serde(rename = "es")]
    Spanish,
    #[default]
    #[serde(rename = "en")]
    English,
}

impl ReplyLanguage {
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::PortugueseBr => "Responda em português do Brasil de forma natural e direta.",
            Self::Spanish => "Responde en español de forma natural y directa.",
            Self::English => "Reply naturally and directly in English.",
        }
    }
}

/// Code the user most recently accepted or rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMemory {
    pub last_accepted: Option<String>,
    pub last_rejected: Option<String>,
}

impl CodeMemory {
    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_none() && self.last_rejected.is_none()
    }
}

/// Everything one model sees for one generation. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelContext {
    pub system_preamble: String,
    pub history_window: Vec<Turn>,
    pub prompt: String,
    pub target_model: ModelRole,
    #[serde(default)]
    pub code_memory: CodeMemory,
    #[serde(default)]
    pub language_hint: Option<CodeKind>,
    #[serde(default)]
    pub sampling: SamplingHint,
}

/// What the user did with a piece of generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeVerdict {
    Accepted,
    Rejected,
    Saved,
}

impl CodeVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for CodeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only record of an accept, reject or save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAction {
    pub timestamp: DateTime<Utc>,
    pub verdict: CodeVerdict,
    #[serde(default)]
    pub prompt: Option<String>,
    pub code: String,
    #[serde(default)]
    pub code_kind: Option<CodeKind>,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl CodeAction {
    pub fn new(verdict: CodeVerdict, code: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            verdict,
            prompt: None,
            code: code.into(),
            code_kind: None,
            file_path: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_code_kind(mut self, kind: Option<CodeKind>) -> Self {
        self.code_kind = kind;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}
