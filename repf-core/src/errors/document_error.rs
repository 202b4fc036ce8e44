//! Policy document errors.

use super::error_code::{self, RepfErrorCode};

/// Errors raised while parsing a policy document or a delay condition.
/// Reported synchronously to the enclosing dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Policy document is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Policy document is not a JSON object")]
    NotAnObject,

    #[error("Policy document is missing the '{field}' field")]
    MissingField { field: String },

    #[error("Policy document field '{field}' has the wrong type: {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid delay condition '{condition}': {message}")]
    InvalidCondition { condition: String, message: String },
}

impl RepfErrorCode for DocumentError {
    fn error_code(&self) -> i64 {
        error_code::SYS_INVALID_INPUT_PARAM
    }
}
