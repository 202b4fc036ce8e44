//! The capability interface every rule engine variant implements.

use std::fmt;

use crate::errors::EngineError;
use crate::event::PolicyEvent;

/// One configured, invocable policy handler.
///
/// `handle` returns a raw code; the dispatcher owns classification. An
/// engine with no rule matching the event must return the continuation
/// sentinel rather than an error: absence of a rule is never a failure.
pub trait RuleEngine: Send + Sync {
    /// Handle one policy event, returning the raw code.
    fn handle(&self, event: &PolicyEvent) -> Result<i64, EngineError>;

    /// Called once when the owning chain is built.
    fn start(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called once when the owning chain is torn down.
    fn stop(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl fmt::Debug for dyn RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn RuleEngine")
    }
}
