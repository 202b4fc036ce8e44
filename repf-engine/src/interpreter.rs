//! Structural recursion over policy documents.

use std::sync::Arc;

use repf_core::delay::{split_instance_tag, DelayCondition, NewDelayedRule};
use repf_core::document::PolicyDocument;
use repf_core::errors::error_code::OPERATION_SUCCESS;
use repf_core::errors::{DocumentError, EngineError};
use repf_core::traits::DelayEnqueue;

use crate::ops::OperationRegistry;

/// Resolves parsed policy documents: enqueue nodes defer onto the delay
/// queue, execute nodes recurse in place, invoke nodes call into the
/// operation registry.
pub struct DocumentInterpreter {
    ops: Arc<OperationRegistry>,
    enqueuer: Arc<dyn DelayEnqueue>,
}

impl DocumentInterpreter {
    pub fn new(ops: Arc<OperationRegistry>, enqueuer: Arc<dyn DelayEnqueue>) -> Self {
        Self { ops, enqueuer }
    }

    /// Resolve a document to a raw return code.
    ///
    /// Enqueueing returns success to the caller immediately; the deferred
    /// payload's own outcome is decided later by the delay server and never
    /// feeds back into this dispatch.
    pub fn resolve(&self, doc: &PolicyDocument) -> Result<i64, EngineError> {
        match doc {
            PolicyDocument::Enqueue {
                delay_conditions,
                payload,
            } => {
                let entry = delayed_rule_from_parts(delay_conditions, payload)?;
                let id = self
                    .enqueuer
                    .enqueue(entry)
                    .map_err(|e| EngineError::Enqueue {
                        message: e.to_string(),
                    })?;
                tracing::debug!(entry_id = id, "deferred policy payload to the delay queue");
                Ok(OPERATION_SUCCESS)
            }
            PolicyDocument::Execute { payload } => self.resolve(payload),
            PolicyDocument::Invoke {
                name,
                parameters,
                configuration,
            } => self.ops.invoke(name, parameters, configuration),
        }
    }
}

/// Build a queue entry from an enqueue node's parts.
///
/// Any `<INST_NAME>` tag in the conditions is normalized into the entry's
/// target field here; the stored condition text is purely temporal.
pub fn delayed_rule_from_parts(
    delay_conditions: &str,
    payload: &PolicyDocument,
) -> Result<NewDelayedRule, DocumentError> {
    let (target, condition_text) = split_instance_tag(delay_conditions);
    let condition = DelayCondition::parse(&condition_text)?;
    let mut entry = NewDelayedRule::new(&payload.to_value().to_string(), condition);
    if let Some(target) = target {
        entry = entry.with_target(&target);
    }
    Ok(entry)
}
