//! Policy-enforcement events flowing through the dispatcher.

use serde_json::Value;

/// Synthetic PEP raised for a direct rule-text submission.
pub const PEP_EXEC_RULE_TEXT: &str = "pep_exec_rule_text";

/// Synthetic PEP raised by the delay server when executing a claimed entry.
pub const PEP_DELAYED_RULE_EXECUTION: &str = "pep_delay_server_rule_execution";

/// A named policy-enforcement event.
///
/// The name identifies one enforcement point, e.g.
/// `pep_api_data_obj_put_post`. Pre and post hooks around the same
/// operation are distinct events; nothing at this level ties them together.
#[derive(Debug, Clone)]
pub struct PolicyEvent {
    pub name: String,
    /// Positional parameters passed to every instance that handles the event.
    pub parameters: Vec<Value>,
    /// Opaque session metadata carried alongside the event.
    pub context: Value,
}

impl PolicyEvent {
    /// Create an event with no parameters.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            context: Value::Null,
        }
    }

    /// Create an event with positional parameters.
    pub fn with_parameters(name: &str, parameters: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            context: Value::Null,
        }
    }

    /// Event wrapping a direct rule-text submission.
    pub fn exec_rule_text(text: &str) -> Self {
        Self::with_parameters(PEP_EXEC_RULE_TEXT, vec![Value::String(text.to_string())])
    }

    /// Event the delay server raises to execute a claimed entry's payload.
    pub fn delayed_execution(payload: &str) -> Self {
        Self::with_parameters(
            PEP_DELAYED_RULE_EXECUTION,
            vec![Value::String(payload.to_string())],
        )
    }

    /// The first parameter as text, if present and textual.
    pub fn text_parameter(&self) -> Option<&str> {
        self.parameters.first().and_then(Value::as_str)
    }
}
