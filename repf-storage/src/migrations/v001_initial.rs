//! V001: Initial schema, the delay queue table.

pub const MIGRATION_SQL: &str = r#"
-- Delay queue: append-only intake, status-guarded lifecycle.
-- The eligibility scan filters on (status, eligible_at_ms) and orders
-- eligible entries by enqueue time.
CREATE TABLE IF NOT EXISTS delay_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_instance TEXT,
    condition TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueue_time_ms INTEGER NOT NULL,
    eligible_at_ms INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    claimed_at_ms INTEGER,
    completed_at_ms INTEGER,
    outcome_code INTEGER,
    error TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_delay_queue_eligible
    ON delay_queue(status, eligible_at_ms);
CREATE INDEX IF NOT EXISTS idx_delay_queue_enqueued
    ON delay_queue(enqueue_time_ms);
"#;
