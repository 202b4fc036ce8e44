//! Policy-composition engine: interprets policy documents as its handling
//! logic.

use std::sync::Arc;

use serde_json::Value;

use repf_core::document::PolicyDocument;
use repf_core::errors::error_code::RULE_ENGINE_CONTINUE;
use repf_core::errors::EngineError;
use repf_core::event::{PolicyEvent, PEP_DELAYED_RULE_EXECUTION, PEP_EXEC_RULE_TEXT};
use repf_core::traits::{DelayEnqueue, RuleEngine};

use crate::interpreter::DocumentInterpreter;
use crate::ops::OperationRegistry;

/// Generic engine variant whose rules are policy documents.
///
/// It claims only the framework's synthetic submission and delayed-execution
/// events, and only when the submitted text is JSON. Opaque rule text
/// belongs to some other engine's rule language, so the composition engine
/// declines it with the continuation sentinel. Text that parses as JSON but
/// violates the document schema is a configuration error, reported
/// synchronously.
pub struct CompositionEngine {
    interpreter: DocumentInterpreter,
}

impl CompositionEngine {
    pub fn new(ops: Arc<OperationRegistry>, enqueuer: Arc<dyn DelayEnqueue>) -> Self {
        Self {
            interpreter: DocumentInterpreter::new(ops, enqueuer),
        }
    }
}

impl RuleEngine for CompositionEngine {
    fn handle(&self, event: &PolicyEvent) -> Result<i64, EngineError> {
        if event.name != PEP_EXEC_RULE_TEXT && event.name != PEP_DELAYED_RULE_EXECUTION {
            return Ok(RULE_ENGINE_CONTINUE);
        }
        let Some(text) = event.text_parameter() else {
            return Ok(RULE_ENGINE_CONTINUE);
        };
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return Ok(RULE_ENGINE_CONTINUE);
        };

        let doc = PolicyDocument::from_value(&value)?;
        self.interpreter.resolve(&doc)
    }
}
