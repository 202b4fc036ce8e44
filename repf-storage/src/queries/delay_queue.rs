//! Queries for the delay_queue table.
//!
//! Every lifecycle mutation carries its previous status in the WHERE
//! clause, so a row can only move pending → executing → {complete |
//! failed} no matter how many callers race on it.

use repf_core::delay::{DelayedRuleEntry, EntryStatus, NewDelayedRule};
use repf_core::errors::StorageError;
use rusqlite::{params, Connection, Row};

const ENTRY_COLUMNS: &str = "id, target_instance, condition, payload, enqueue_time_ms, \
     eligible_at_ms, status, outcome_code, error";

fn map_entry(row: &Row<'_>) -> rusqlite::Result<DelayedRuleEntry> {
    let status_text: String = row.get(6)?;
    // The mutations only ever write the four known statuses; anything
    // else in the column reads back as failed.
    let status = EntryStatus::parse(&status_text).unwrap_or(EntryStatus::Failed);
    Ok(DelayedRuleEntry {
        id: row.get(0)?,
        target_instance: row.get(1)?,
        condition: row.get(2)?,
        payload: row.get(3)?,
        enqueue_time_ms: row.get(4)?,
        eligible_at_ms: row.get(5)?,
        status,
        outcome_code: row.get(7)?,
        error: row.get(8)?,
    })
}

fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

/// Append a new entry (status = 'pending'). Returns the row id.
pub fn insert_entry(
    conn: &Connection,
    rule: &NewDelayedRule,
    enqueue_time_ms: i64,
) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO delay_queue
            (target_instance, condition, payload, enqueue_time_ms, eligible_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            rule.target_instance,
            rule.condition.raw(),
            rule.payload,
            enqueue_time_ms,
            rule.condition.eligible_at(enqueue_time_ms),
        ],
    )
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a single entry by id.
pub fn get_entry(conn: &Connection, id: i64) -> Result<DelayedRuleEntry, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ENTRY_COLUMNS} FROM delay_queue WHERE id = ?1"
        ))
        .map_err(sqlite_err)?;

    stmt.query_row(params![id], map_entry)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::EntryNotFound { id },
            other => sqlite_err(other),
        })
}

/// List every entry in execution order (enqueue time, then id).
pub fn list_entries(conn: &Connection) -> Result<Vec<DelayedRuleEntry>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ENTRY_COLUMNS} FROM delay_queue
             ORDER BY enqueue_time_ms ASC, id ASC"
        ))
        .map_err(sqlite_err)?;

    let rows = stmt.query_map([], map_entry).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Pending entries whose eligibility floor has passed, in execution order.
pub fn eligible_pending(
    conn: &Connection,
    now_ms: i64,
    limit: usize,
) -> Result<Vec<DelayedRuleEntry>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ENTRY_COLUMNS} FROM delay_queue
             WHERE status = 'pending' AND eligible_at_ms <= ?1
             ORDER BY enqueue_time_ms ASC, id ASC
             LIMIT ?2"
        ))
        .map_err(sqlite_err)?;

    let rows = stmt
        .query_map(params![now_ms, limit as i64], map_entry)
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Atomically claim a pending entry for execution.
///
/// Returns false when another claimant got there first (or the entry is
/// gone); the loser must skip the entry, never execute it.
pub fn claim_entry(conn: &Connection, id: i64, now_ms: i64) -> Result<bool, StorageError> {
    let rows = conn
        .execute(
            "UPDATE delay_queue SET status = 'executing', claimed_at_ms = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, now_ms],
        )
        .map_err(sqlite_err)?;
    Ok(rows == 1)
}

/// Record a successful execution outcome for a claimed entry.
pub fn mark_complete(
    conn: &Connection,
    id: i64,
    outcome_code: i64,
    now_ms: i64,
) -> Result<(), StorageError> {
    finish_entry(conn, id, "complete", outcome_code, None, now_ms)
}

/// Record a failed execution outcome for a claimed entry.
///
/// Failed entries stay in the queue for inspection; nothing re-runs them
/// automatically.
pub fn mark_failed(
    conn: &Connection,
    id: i64,
    outcome_code: i64,
    error: &str,
    now_ms: i64,
) -> Result<(), StorageError> {
    finish_entry(conn, id, "failed", outcome_code, Some(error), now_ms)
}

fn finish_entry(
    conn: &Connection,
    id: i64,
    status: &str,
    outcome_code: i64,
    error: Option<&str>,
    now_ms: i64,
) -> Result<(), StorageError> {
    let rows = conn
        .execute(
            "UPDATE delay_queue
             SET status = ?2, outcome_code = ?3, error = ?4, completed_at_ms = ?5
             WHERE id = ?1 AND status = 'executing'",
            params![id, status, outcome_code, error, now_ms],
        )
        .map_err(sqlite_err)?;
    if rows == 1 {
        return Ok(());
    }
    Err(status_conflict(conn, id, EntryStatus::Executing))
}

/// Remove a pending entry before it is claimed.
///
/// Cancellation loses the race once a claimant has moved the entry to
/// executing.
pub fn cancel_pending(conn: &Connection, id: i64) -> Result<(), StorageError> {
    let rows = conn
        .execute(
            "DELETE FROM delay_queue WHERE id = ?1 AND status = 'pending'",
            params![id],
        )
        .map_err(sqlite_err)?;
    if rows == 1 {
        return Ok(());
    }
    Err(status_conflict(conn, id, EntryStatus::Pending))
}

/// Return executing entries to pending after an unclean shutdown.
///
/// Only meaningful before the delay server starts; while it runs,
/// executing rows belong to live claimants.
pub fn requeue_executing(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute(
        "UPDATE delay_queue SET status = 'pending', claimed_at_ms = NULL
         WHERE status = 'executing'",
        [],
    )
    .map_err(sqlite_err)
}

/// Count entries per status.
pub fn count_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT status, COUNT(*) FROM delay_queue GROUP BY status")
        .map_err(sqlite_err)?;

    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Build the error for a guarded mutation that matched no row: either the
/// entry is missing or it sits in a status the mutation does not accept.
fn status_conflict(conn: &Connection, id: i64, expected: EntryStatus) -> StorageError {
    match get_entry(conn, id) {
        Ok(entry) => StorageError::InvalidStatus {
            id,
            status: entry.status.as_str().to_string(),
            expected: expected.as_str().to_string(),
        },
        Err(e) => e,
    }
}
