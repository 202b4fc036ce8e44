//! Rule engine execution errors.

use super::error_code::{self, RepfErrorCode};
use super::{ConfigError, DocumentError};

/// Errors raised by an instance while handling an event, or by the
/// dispatcher while resolving a target instance.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("Malformed rule submission: {message}")]
    MalformedSubmission { message: String },

    #[error("Rule execution failed with code {code}: {message}")]
    Execution { code: i64, message: String },

    #[error("Delay queue rejected entry: {message}")]
    Enqueue { message: String },
}

impl RepfErrorCode for EngineError {
    fn error_code(&self) -> i64 {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Document(e) => e.error_code(),
            Self::UnknownOperation { .. } => error_code::SYS_INVALID_INPUT_PARAM,
            Self::MalformedSubmission { .. } => error_code::SYS_INVALID_INPUT_PARAM,
            Self::Execution { code, .. } => *code,
            Self::Enqueue { .. } => error_code::RULE_ENGINE_ERROR,
        }
    }
}
