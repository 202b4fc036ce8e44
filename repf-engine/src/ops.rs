//! Registry of named operations addressable from policy documents.

use std::collections::HashMap;

use serde_json::{Map, Value};

use repf_core::errors::EngineError;

/// A registered operation: parameter and configuration maps in, raw return
/// code out.
pub type Operation = Box<
    dyn Fn(&Map<String, Value>, &Map<String, Value>) -> Result<i64, EngineError>
        + Send
        + Sync,
>;

/// Operations a policy document can invoke via `policy_to_invoke`.
#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Operation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, op: F)
    where
        F: Fn(&Map<String, Value>, &Map<String, Value>) -> Result<i64, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.operations.insert(name.to_string(), Box::new(op));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Invoke a registered operation. An unregistered name is a
    /// configuration error, surfaced synchronously to the enclosing
    /// dispatch.
    pub fn invoke(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
        configuration: &Map<String, Value>,
    ) -> Result<i64, EngineError> {
        match self.operations.get(name) {
            Some(op) => op(parameters, configuration),
            None => Err(EngineError::UnknownOperation {
                name: name.to_string(),
            }),
        }
    }
}
