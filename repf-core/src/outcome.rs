//! Return-code classification and dispatch outcomes.

use crate::errors::error_code::{OPERATION_SUCCESS, RULE_ENGINE_CONTINUE};

/// How the dispatcher interprets a code returned by an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass {
    /// Defer to the next instance in the chain.
    Continuation,
    /// Stop the chain; the operation proceeds normally.
    TerminalSuccess,
    /// Stop the chain; the code surfaces as the operation's failure.
    TerminalError,
}

/// Classify a raw return code.
///
/// Exactly one code continues the chain and exactly one terminates it
/// successfully; everything else terminates it as an error, positive
/// codes included.
pub fn classify(code: i64) -> CodeClass {
    match code {
        RULE_ENGINE_CONTINUE => CodeClass::Continuation,
        OPERATION_SUCCESS => CodeClass::TerminalSuccess,
        _ => CodeClass::TerminalError,
    }
}

/// The single outcome produced by dispatching one event through the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The terminal code, or zero when the chain exhausted on continuations.
    pub code: i64,
    /// The instance that produced the terminal code, if any.
    pub issuing_instance: Option<String>,
}

impl DispatchOutcome {
    /// Outcome of a chain that exhausted with every instance continuing.
    pub fn implicit_success() -> Self {
        Self {
            code: OPERATION_SUCCESS,
            issuing_instance: None,
        }
    }

    /// Outcome terminated by `instance` with `code`.
    pub fn terminal(code: i64, instance: &str) -> Self {
        Self {
            code,
            issuing_instance: Some(instance.to_string()),
        }
    }

    /// Returns true if the code classifies as a terminal error.
    pub fn is_error(&self) -> bool {
        classify(self.code) == CodeClass::TerminalError
    }

    /// Issuing instance for reporting; `"none"` when the chain exhausted
    /// without a terminal code.
    pub fn issuer(&self) -> &str {
        self.issuing_instance.as_deref().unwrap_or("none")
    }
}
