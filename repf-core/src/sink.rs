//! The return-code log sink: one line per instance invocation per dispatch.

use std::sync::Mutex;

/// Format the line recorded for every instance invocation.
///
/// The `returned '<code>' to REPF.` tail is consumed verbatim by
/// observability tooling and must not change.
pub fn return_code_line(instance: &str, code: i64) -> String {
    format!("rule engine plugin [{instance}] returned '{code}' to REPF.")
}

/// Observes the code every instance returns.
///
/// The dispatcher reports each invocation here before acting on the code;
/// a terminal code is never surfaced without its line having been recorded
/// first.
pub trait ReturnCodeSink: Send + Sync {
    fn code_returned(&self, instance: &str, pep_name: &str, code: i64);
}

/// Default sink: emits the line through `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReturnCodeSink for TracingSink {
    fn code_returned(&self, instance: &str, pep_name: &str, code: i64) {
        tracing::info!(pep = %pep_name, "{}", return_code_line(instance, code));
    }
}

/// Collecting sink for tests: records every line in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of recorded lines containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl ReturnCodeSink for MemorySink {
    fn code_returned(&self, instance: &str, _pep_name: &str, code: i64) {
        let line = return_code_line(instance, code);
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}
