//! On-disk queue behavior: reopen survival, crash recovery, claim races.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use repf_core::delay::{DelayCondition, EntryStatus, NewDelayedRule};
use repf_core::traits::DelayEnqueue;
use repf_storage::connection::pragmas::verify_wal_mode;
use repf_storage::migrations;
use repf_storage::{DelayQueue, QueueConnection};

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("delay_queue.db")
}

fn immediate_rule(payload: &str) -> NewDelayedRule {
    NewDelayedRule::new(payload, DelayCondition::immediate())
}

#[test]
fn open_applies_wal_and_schema() {
    let dir = TempDir::new().unwrap();
    let conn = QueueConnection::open(&db_path(&dir)).unwrap();

    conn.with_conn(|c| {
        assert!(verify_wal_mode(c).unwrap());
        assert_eq!(migrations::current_version(c).unwrap(), 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn entries_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let id = {
        let queue = DelayQueue::open(&path).unwrap();
        let rule = NewDelayedRule::new(
            "{\"policy_to_invoke\":\"noop\"}",
            DelayCondition::parse("5m").unwrap(),
        )
        .with_target("re-instance");
        queue.enqueue(rule).unwrap()
    };

    let queue = DelayQueue::open(&path).unwrap();
    let entry = queue.get(id).unwrap();
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.condition, "5m");
    assert_eq!(entry.target_instance.as_deref(), Some("re-instance"));
    assert_eq!(entry.eligible_at_ms, entry.enqueue_time_ms + 300_000);
}

#[test]
fn interrupted_executions_recover_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let (claimed, finished) = {
        let queue = DelayQueue::open(&path).unwrap();
        let claimed = queue.enqueue(immediate_rule("a")).unwrap();
        let finished = queue.enqueue(immediate_rule("b")).unwrap();
        assert!(queue.claim(claimed).unwrap());
        assert!(queue.claim(finished).unwrap());
        queue.complete(finished, 0).unwrap();
        // Dropped mid-execution of `claimed`.
        (claimed, finished)
    };

    let queue = DelayQueue::open(&path).unwrap();
    assert_eq!(queue.recover_interrupted().unwrap(), 1);
    assert_eq!(queue.get(claimed).unwrap().status, EntryStatus::Pending);
    assert_eq!(queue.get(finished).unwrap().status, EntryStatus::Complete);
}

#[test]
fn concurrent_claims_settle_on_one_winner() {
    let dir = TempDir::new().unwrap();
    let queue = Arc::new(DelayQueue::open(&db_path(&dir)).unwrap());
    let id = queue.enqueue(immediate_rule("contested")).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        handles.push(thread::spawn(move || queue.claim(id).unwrap()));
    }

    let wins: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap() as usize)
        .sum();
    assert_eq!(wins, 1);
    assert_eq!(queue.get(id).unwrap().status, EntryStatus::Executing);
}

#[test]
fn execution_order_is_enqueue_order_not_eligibility_order() {
    let dir = TempDir::new().unwrap();
    let queue = DelayQueue::open(&db_path(&dir)).unwrap();

    // First entry has the later eligibility floor.
    let slow = queue
        .enqueue(NewDelayedRule::new(
            "slow",
            DelayCondition::parse("1h").unwrap(),
        ))
        .unwrap();
    let fast = queue.enqueue(immediate_rule("fast")).unwrap();

    // Before the floor passes only the immediate entry is visible.
    let now = queue.get(fast).unwrap().enqueue_time_ms;
    let visible: Vec<i64> = queue
        .eligible_before(now, 16)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(visible, [fast]);

    // Once both are eligible, enqueue order decides.
    let later = queue.get(slow).unwrap().eligible_at_ms;
    let visible: Vec<i64> = queue
        .eligible_before(later, 16)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(visible, [slow, fast]);
}
