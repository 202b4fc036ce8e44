//! Recursive policy documents: enqueue, execute, invoke.

use serde_json::{Map, Value};

use crate::errors::DocumentError;

/// Directive that defers its payload onto the delay queue.
pub const POLICY_ENQUEUE_RULE: &str = "irods_policy_enqueue_rule";

/// Directive that resolves its payload synchronously.
pub const POLICY_EXECUTE_RULE: &str = "irods_policy_execute_rule";

/// A parsed policy document.
///
/// Documents are parsed once from JSON and interpreted by structural
/// recursion; the directive strings never travel beyond parsing and
/// serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDocument {
    /// Defer the nested document onto the delay queue.
    Enqueue {
        delay_conditions: String,
        payload: Box<PolicyDocument>,
    },
    /// Resolve the nested document synchronously, in place.
    Execute { payload: Box<PolicyDocument> },
    /// Invoke a named operation with parameter and configuration maps.
    Invoke {
        name: String,
        parameters: Map<String, Value>,
        configuration: Map<String, Value>,
    },
}

impl PolicyDocument {
    /// Parse a document from JSON text.
    pub fn from_str(text: &str) -> Result<Self, DocumentError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DocumentError::InvalidJson {
                message: e.to_string(),
            })?;
        Self::from_value(&value)
    }

    /// Parse a document from an already-decoded JSON value.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let obj = value.as_object().ok_or(DocumentError::NotAnObject)?;

        // Terminal form: { "policy_to_invoke": <name>, "parameters": {...},
        // "configuration": {...} }.
        if let Some(name) = obj.get("policy_to_invoke") {
            let name = name.as_str().ok_or_else(|| DocumentError::InvalidField {
                field: "policy_to_invoke".to_string(),
                message: "expected a string".to_string(),
            })?;
            return Ok(Self::Invoke {
                name: name.to_string(),
                parameters: optional_map(obj, "parameters")?,
                configuration: optional_map(obj, "configuration")?,
            });
        }

        let policy = obj
            .get("policy")
            .ok_or_else(|| DocumentError::MissingField {
                field: "policy".to_string(),
            })?
            .as_str()
            .ok_or_else(|| DocumentError::InvalidField {
                field: "policy".to_string(),
                message: "expected a string".to_string(),
            })?;

        match policy {
            POLICY_ENQUEUE_RULE => {
                let delay_conditions = match obj.get("delay_conditions") {
                    Some(v) => v
                        .as_str()
                        .ok_or_else(|| DocumentError::InvalidField {
                            field: "delay_conditions".to_string(),
                            message: "expected a string".to_string(),
                        })?
                        .to_string(),
                    None => String::new(),
                };
                Ok(Self::Enqueue {
                    delay_conditions,
                    payload: Box::new(Self::from_value(required_payload(obj)?)?),
                })
            }
            POLICY_EXECUTE_RULE => Ok(Self::Execute {
                payload: Box::new(Self::from_value(required_payload(obj)?)?),
            }),
            // Any other policy names an operation directly; whether it is
            // registered is resolved at interpretation time.
            name => Ok(Self::Invoke {
                name: name.to_string(),
                parameters: optional_map(obj, "parameters")?,
                configuration: optional_map(obj, "configuration")?,
            }),
        }
    }

    /// Serialize back to JSON, e.g. to persist an enqueued payload.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Enqueue {
                delay_conditions,
                payload,
            } => serde_json::json!({
                "policy": POLICY_ENQUEUE_RULE,
                "delay_conditions": delay_conditions,
                "payload": payload.to_value(),
            }),
            Self::Execute { payload } => serde_json::json!({
                "policy": POLICY_EXECUTE_RULE,
                "payload": payload.to_value(),
            }),
            Self::Invoke {
                name,
                parameters,
                configuration,
            } => serde_json::json!({
                "policy_to_invoke": name,
                "parameters": parameters,
                "configuration": configuration,
            }),
        }
    }
}

fn required_payload(obj: &Map<String, Value>) -> Result<&Value, DocumentError> {
    obj.get("payload").ok_or_else(|| DocumentError::MissingField {
        field: "payload".to_string(),
    })
}

fn optional_map(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<Map<String, Value>, DocumentError> {
    match obj.get(field) {
        None => Ok(Map::new()),
        Some(v) => v
            .as_object()
            .cloned()
            .ok_or_else(|| DocumentError::InvalidField {
                field: field.to_string(),
                message: "expected an object".to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_enqueue_execute_invoke() {
        let doc = PolicyDocument::from_str(
            r#"{
                "policy" : "irods_policy_enqueue_rule",
                "delay_conditions" : "",
                "payload" : {
                    "policy" : "irods_policy_execute_rule",
                    "payload" : {
                        "policy_to_invoke" : "create_flag_object",
                        "parameters" : {},
                        "configuration" : {}
                    }
                }
            }"#,
        )
        .unwrap();

        let PolicyDocument::Enqueue {
            delay_conditions,
            payload,
        } = doc
        else {
            panic!("expected an enqueue document");
        };
        assert_eq!(delay_conditions, "");

        let PolicyDocument::Execute { payload } = *payload else {
            panic!("expected an execute document");
        };
        let PolicyDocument::Invoke { name, .. } = *payload else {
            panic!("expected an invoke document");
        };
        assert_eq!(name, "create_flag_object");
    }

    #[test]
    fn missing_payload_is_rejected() {
        let err = PolicyDocument::from_str(r#"{"policy": "irods_policy_enqueue_rule"}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::MissingField { ref field } if field == "payload"));
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(matches!(
            PolicyDocument::from_str("[1, 2, 3]"),
            Err(DocumentError::NotAnObject)
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            PolicyDocument::from_str("writeLine(\"serverLog\", \"hi\")"),
            Err(DocumentError::InvalidJson { .. })
        ));
    }

    #[test]
    fn bare_policy_name_parses_as_invoke() {
        let doc = PolicyDocument::from_str(
            r#"{"policy": "my_operation", "parameters": {"k": "v"}}"#,
        )
        .unwrap();
        let PolicyDocument::Invoke {
            name, parameters, ..
        } = doc
        else {
            panic!("expected an invoke document");
        };
        assert_eq!(name, "my_operation");
        assert_eq!(parameters.get("k").and_then(Value::as_str), Some("v"));
    }

    #[test]
    fn documents_round_trip_through_json() {
        let text = r#"{
            "policy" : "irods_policy_enqueue_rule",
            "delay_conditions" : "0.1s",
            "payload" : { "policy_to_invoke" : "noop" }
        }"#;
        let doc = PolicyDocument::from_str(text).unwrap();
        let reparsed = PolicyDocument::from_value(&doc.to_value()).unwrap();
        assert_eq!(doc, reparsed);
    }
}
