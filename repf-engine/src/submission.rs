//! Parsing of textual rule submissions.

use repf_core::delay::{split_instance_tag, DelayCondition, NewDelayedRule};
use repf_core::document::PolicyDocument;
use repf_core::errors::EngineError;

use crate::interpreter::delayed_rule_from_parts;

/// A parsed rule submission.
#[derive(Debug)]
pub enum Submission {
    /// Goes onto the delay queue; the submitter gets the entry id back
    /// immediately.
    Delayed(NewDelayedRule),
    /// A policy document resolved synchronously.
    Document(PolicyDocument),
    /// Opaque rule text for whichever engine in the chain claims it.
    Text(String),
}

/// Parse a rule submission into one of its three accepted forms:
///
/// - `delay("<conditions>") { <body> }` rule-language form, where the
///   conditions may carry an `<INST_NAME>` targeting tag;
/// - a JSON policy document, where an enqueue root is itself a delayed
///   submission;
/// - anything else, passed through as opaque rule text.
pub fn parse_submission(text: &str) -> Result<Submission, EngineError> {
    let trimmed = text.trim();

    if let Some(entry) = parse_delay_form(trimmed)? {
        return Ok(Submission::Delayed(entry));
    }

    if trimmed.starts_with('{') {
        let doc = PolicyDocument::from_str(trimmed)?;
        if let PolicyDocument::Enqueue {
            delay_conditions,
            payload,
        } = &doc
        {
            let entry = delayed_rule_from_parts(delay_conditions, payload)?;
            return Ok(Submission::Delayed(entry));
        }
        return Ok(Submission::Document(doc));
    }

    Ok(Submission::Text(trimmed.to_string()))
}

/// Parse the `delay("...") { ... }` form, returning `None` when the text is
/// not a delay rule at all.
fn parse_delay_form(text: &str) -> Result<Option<NewDelayedRule>, EngineError> {
    let Some(rest) = text.strip_prefix("delay(") else {
        return Ok(None);
    };

    let rest = rest.trim_start();
    let Some(rest) = rest.strip_prefix('"') else {
        return Err(malformed("expected a quoted condition after delay("));
    };
    let Some(quote_end) = rest.find('"') else {
        return Err(malformed("unterminated condition string"));
    };
    let conditions = &rest[..quote_end];

    let after = rest[quote_end + 1..].trim_start();
    let Some(after) = after.strip_prefix(')') else {
        return Err(malformed("expected ')' after the condition string"));
    };
    let after = after.trim_start();
    let Some(body_region) = after.strip_prefix('{') else {
        return Err(malformed("expected '{' to open the rule body"));
    };

    let body = take_balanced_body(body_region)?;
    let entry = delayed_rule_from_text(conditions, body.trim())?;
    Ok(Some(entry))
}

/// Like `delayed_rule_from_parts`, but for an opaque rule-text payload.
fn delayed_rule_from_text(
    delay_conditions: &str,
    payload: &str,
) -> Result<NewDelayedRule, EngineError> {
    let (target, condition_text) = split_instance_tag(delay_conditions);
    let condition = DelayCondition::parse(&condition_text)?;
    let mut entry = NewDelayedRule::new(payload, condition);
    if let Some(target) = target {
        entry = entry.with_target(&target);
    }
    Ok(entry)
}

/// Take the brace-balanced body opened just before `text`, ignoring braces
/// inside double-quoted strings.
fn take_balanced_body(text: &str) -> Result<&str, EngineError> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[..idx]);
                }
            }
            _ => {}
        }
    }
    Err(malformed("unbalanced braces in rule body"))
}

fn malformed(message: &str) -> EngineError {
    EngineError::MalformedSubmission {
        message: message.to_string(),
    }
}
