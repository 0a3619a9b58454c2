//! Error types for the Tandem system.

use crate::types::ModelRole;

/// Result type alias for Tandem operations.
pub type Result<T> = std::result::Result<T, TandemError>;

/// Main error type for the Tandem system.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TandemError {
    /// Prompt rejected at the boundary (empty or over-length)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Inference engine not loaded or not reachable
    #[error("{role} model unavailable: {reason}")]
    ModelUnavailable { role: ModelRole, reason: String },

    /// Generation exceeded its wall-clock budget
    #[error("{role} model timed out after {seconds}s")]
    GenerationTimeout { role: ModelRole, seconds: u64 },

    /// Any other inference failure
    #[error("{role} generation failed: {reason}")]
    Generation { role: ModelRole, reason: String },

    /// Input larger than the boundary accepts
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// History or artifact persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TandemError {
    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new model unavailable error
    pub fn model_unavailable(role: ModelRole, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            role,
            reason: reason.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(role: ModelRole, seconds: u64) -> Self {
        Self::GenerationTimeout { role, seconds }
    }

    /// Create a new generation error
    pub fn generation(role: ModelRole, reason: impl Into<String>) -> Self {
        Self::Generation {
            role,
            reason: reason.into(),
        }
    }

    /// Create a new payload too large error
    pub fn too_large(msg: impl Into<String>) -> Self {
        Self::PayloadTooLarge(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is an invalid input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Check if this is a model unavailable error
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::GenerationTimeout { .. })
    }

    /// Stable machine-readable label, used in logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::Generation { .. } => "generation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for TandemError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TandemError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for TandemError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TandemError::model_unavailable(ModelRole::Code, "connection refused");
        assert_eq!(err.to_string(), "code model unavailable: connection refused");

        let err = TandemError::timeout(ModelRole::Dialogue, 30);
        assert_eq!(err.to_string(), "dialogue model timed out after 30s");
    }

    #[test]
    fn test_error_predicates() {
        assert!(TandemError::invalid_input("empty").is_invalid_input());
        assert!(TandemError::timeout(ModelRole::Code, 1).is_timeout());
        assert!(!TandemError::storage("disk full").is_model_unavailable());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TandemError = io_err.into();
        assert_eq!(err.kind(), "io");
    }
}
