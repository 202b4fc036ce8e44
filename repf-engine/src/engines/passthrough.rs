//! Passthrough engine: a data-driven table mapping PEP-name patterns to
//! fixed return codes.

use regex::Regex;
use serde_json::Value;

use repf_core::errors::error_code::RULE_ENGINE_CONTINUE;
use repf_core::errors::{ConfigError, EngineError};
use repf_core::event::PolicyEvent;
use repf_core::traits::RuleEngine;

/// Instrumentation variant: matches the event name against an ordered
/// `{regex, code}` table and returns the first matching code, else the
/// continuation sentinel.
///
/// Configured via `plugin_specific_configuration.return_codes_for_peps`.
/// Patterns must match the whole event name. An absent table means the
/// engine continues for every event.
pub struct PassthroughEngine {
    table: Vec<(Regex, i64)>,
}

impl PassthroughEngine {
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        let field = "plugin_specific_configuration.return_codes_for_peps";

        let entries = match config.get("return_codes_for_peps") {
            None => return Ok(Self { table: Vec::new() }),
            Some(Value::Null) => return Ok(Self { table: Vec::new() }),
            Some(v) => v.as_array().ok_or_else(|| ConfigError::ValidationFailed {
                field: field.to_string(),
                message: "expected an array of {regex, code} objects".to_string(),
            })?,
        };

        let mut table = Vec::with_capacity(entries.len());
        for entry in entries {
            let pattern = entry
                .get("regex")
                .and_then(Value::as_str)
                .ok_or_else(|| ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "entry is missing a 'regex' string".to_string(),
                })?;
            let code = entry.get("code").and_then(Value::as_i64).ok_or_else(|| {
                ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "entry is missing an integer 'code'".to_string(),
                }
            })?;

            // Anchor so the pattern covers the whole event name.
            let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: format!("invalid regex '{pattern}': {e}"),
                }
            })?;
            table.push((regex, code));
        }

        Ok(Self { table })
    }

    pub fn rule_count(&self) -> usize {
        self.table.len()
    }
}

impl RuleEngine for PassthroughEngine {
    fn handle(&self, event: &PolicyEvent) -> Result<i64, EngineError> {
        for (regex, code) in &self.table {
            if regex.is_match(&event.name) {
                return Ok(*code);
            }
        }
        Ok(RULE_ENGINE_CONTINUE)
    }
}
