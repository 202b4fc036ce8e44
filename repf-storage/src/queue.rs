//! The delay queue facade used by the engine and the delay server.

use std::path::Path;

use repf_core::delay::{unix_time_ms, DelayedRuleEntry, NewDelayedRule};
use repf_core::errors::StorageError;
use repf_core::traits::DelayEnqueue;

use crate::connection::QueueConnection;
use crate::queries::delay_queue;

/// Persistent FIFO of deferred rule executions.
///
/// Shared between the enqueue path (rule engines appending entries) and
/// the delay server (claiming and finishing them); the claim step is the
/// only point of contention and it is settled by a guarded update.
pub struct DelayQueue {
    conn: QueueConnection,
}

impl DelayQueue {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            conn: QueueConnection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: QueueConnection::open_in_memory()?,
        })
    }

    /// Fetch a single entry by id.
    pub fn get(&self, id: i64) -> Result<DelayedRuleEntry, StorageError> {
        self.conn.with_conn(|c| delay_queue::get_entry(c, id))
    }

    /// Every entry, in execution order.
    pub fn entries(&self) -> Result<Vec<DelayedRuleEntry>, StorageError> {
        self.conn.with_conn(delay_queue::list_entries)
    }

    /// Pending entries eligible at `now_ms`, in execution order.
    pub fn eligible_before(
        &self,
        now_ms: i64,
        limit: usize,
    ) -> Result<Vec<DelayedRuleEntry>, StorageError> {
        self.conn
            .with_conn(|c| delay_queue::eligible_pending(c, now_ms, limit))
    }

    /// Claim a pending entry; false means another claimant won.
    pub fn claim(&self, id: i64) -> Result<bool, StorageError> {
        self.conn
            .with_conn(|c| delay_queue::claim_entry(c, id, unix_time_ms()))
    }

    /// Finish a claimed entry with a success outcome.
    pub fn complete(&self, id: i64, outcome_code: i64) -> Result<(), StorageError> {
        self.conn
            .with_conn(|c| delay_queue::mark_complete(c, id, outcome_code, unix_time_ms()))
    }

    /// Finish a claimed entry with a failure outcome.
    pub fn fail(&self, id: i64, outcome_code: i64, error: &str) -> Result<(), StorageError> {
        self.conn.with_conn(|c| {
            delay_queue::mark_failed(c, id, outcome_code, error, unix_time_ms())
        })
    }

    /// Remove a pending entry before it runs.
    pub fn cancel(&self, id: i64) -> Result<(), StorageError> {
        self.conn.with_conn(|c| delay_queue::cancel_pending(c, id))
    }

    /// Entry counts per status string.
    pub fn counts(&self) -> Result<Vec<(String, i64)>, StorageError> {
        self.conn.with_conn(delay_queue::count_by_status)
    }

    /// Return entries stranded in executing by an unclean shutdown to
    /// pending. Call before the delay server starts polling.
    pub fn recover_interrupted(&self) -> Result<usize, StorageError> {
        let requeued = self.conn.with_conn(delay_queue::requeue_executing)?;
        if requeued > 0 {
            tracing::warn!(requeued, "requeued interrupted delay queue entries");
        }
        Ok(requeued)
    }
}

impl DelayEnqueue for DelayQueue {
    fn enqueue(&self, rule: NewDelayedRule) -> Result<i64, StorageError> {
        let now = unix_time_ms();
        let id = self
            .conn
            .with_conn(|c| delay_queue::insert_entry(c, &rule, now))?;
        tracing::info!(
            id,
            condition = rule.condition.raw(),
            target = rule.target_instance.as_deref().unwrap_or(""),
            "enqueued delayed rule"
        );
        Ok(id)
    }
}
