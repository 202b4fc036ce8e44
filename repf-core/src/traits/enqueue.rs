//! Seam between policy interpretation and durable queue storage.

use crate::delay::NewDelayedRule;
use crate::errors::StorageError;

/// Accepts deferred rule executions for later processing.
///
/// `enqueue` appends durably and returns immediately; it never blocks on
/// downstream execution, and the caller's own outcome never depends on when
/// the entry later runs.
pub trait DelayEnqueue: Send + Sync {
    /// Append an entry, returning its queue id.
    fn enqueue(&self, entry: NewDelayedRule) -> Result<i64, StorageError>;
}
