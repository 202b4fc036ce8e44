//! Delayed rule entries and their eligibility conditions.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::DocumentError;

const INST_NAME_OPEN: &str = "<INST_NAME>";
const INST_NAME_CLOSE: &str = "</INST_NAME>";

/// Current wall-clock time as Unix epoch milliseconds.
pub fn unix_time_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Lifecycle status of a delay queue entry.
/// Moves strictly forward; nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Executing,
    Complete,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "executing" => Some(Self::Executing),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Legal transitions: pending → executing → {complete | failed}.
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executing)
                | (Self::Executing, Self::Complete)
                | (Self::Executing, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Split a `<INST_NAME>...</INST_NAME>` targeting tag off a condition string.
///
/// The tag is normalized away at parse time; it never survives into the
/// stored condition text.
pub fn split_instance_tag(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix(INST_NAME_OPEN) {
        if let Some(end) = rest.find(INST_NAME_CLOSE) {
            let instance = rest[..end].trim();
            let remainder = rest[end + INST_NAME_CLOSE.len()..].to_string();
            let instance = (!instance.is_empty()).then(|| instance.to_string());
            return (instance, remainder);
        }
    }
    (None, trimmed.to_string())
}

/// Minimum-eligibility predicate for a delayed entry.
///
/// Accepted forms: the empty string (eligible immediately), a duration such
/// as `0.1s`, `5m`, `2h` or `1d` (a bare number is seconds), and the same
/// duration wrapped in `<PLUSET>...</PLUSET>`.
///
/// Eligibility is a floor, not a deadline: the delay server may execute an
/// entry arbitrarily later, never earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayCondition {
    raw: String,
    delay_ms: i64,
}

impl DelayCondition {
    /// Condition that is eligible immediately but still asynchronous.
    pub fn immediate() -> Self {
        Self {
            raw: String::new(),
            delay_ms: 0,
        }
    }

    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let raw = text.to_string();
        let mut body = text.trim();

        if let Some(rest) = body.strip_prefix("<PLUSET>") {
            body = match rest.strip_suffix("</PLUSET>") {
                Some(inner) => inner.trim(),
                None => {
                    return Err(DocumentError::InvalidCondition {
                        condition: raw,
                        message: "unterminated <PLUSET> tag".to_string(),
                    })
                }
            };
        }

        if body.is_empty() {
            return Ok(Self { raw, delay_ms: 0 });
        }

        let (digits, unit) = match body.find(|c: char| !c.is_ascii_digit() && c != '.') {
            Some(idx) => body.split_at(idx),
            None => (body, ""),
        };
        let value: f64 = digits.parse().map_err(|_| DocumentError::InvalidCondition {
            condition: raw.clone(),
            message: "expected a duration such as 0.1s, 5m or 2h".to_string(),
        })?;
        if !value.is_finite() {
            return Err(DocumentError::InvalidCondition {
                condition: raw,
                message: "duration must be finite".to_string(),
            });
        }
        let unit_seconds = match unit.trim() {
            "" | "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            other => {
                return Err(DocumentError::InvalidCondition {
                    condition: raw,
                    message: format!("unknown duration unit '{other}'"),
                })
            }
        };

        Ok(Self {
            raw,
            delay_ms: (value * unit_seconds * 1000.0).round() as i64,
        })
    }

    /// The original condition text, as submitted.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    /// Earliest execution time for an entry enqueued at `enqueue_time_ms`.
    pub fn eligible_at(&self, enqueue_time_ms: i64) -> i64 {
        enqueue_time_ms.saturating_add(self.delay_ms)
    }
}

/// A deferred rule execution request, ready to append to the queue.
#[derive(Debug, Clone)]
pub struct NewDelayedRule {
    /// Explicit target instance; the chain's default target applies when
    /// absent.
    pub target_instance: Option<String>,
    pub condition: DelayCondition,
    /// Policy document or opaque rule text, executed when the entry is
    /// claimed.
    pub payload: String,
}

impl NewDelayedRule {
    pub fn new(payload: &str, condition: DelayCondition) -> Self {
        Self {
            target_instance: None,
            condition,
            payload: payload.to_string(),
        }
    }

    pub fn with_target(mut self, instance: &str) -> Self {
        self.target_instance = Some(instance.to_string());
        self
    }
}

/// A persisted delay queue entry.
#[derive(Debug, Clone)]
pub struct DelayedRuleEntry {
    pub id: i64,
    pub target_instance: Option<String>,
    pub condition: String,
    pub payload: String,
    pub enqueue_time_ms: i64,
    pub eligible_at_ms: i64,
    pub status: EntryStatus,
    pub outcome_code: Option<i64>,
    pub error: Option<String>,
}
