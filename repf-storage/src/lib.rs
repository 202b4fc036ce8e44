//! # repf-storage
//!
//! SQLite persistence for the delay queue.
//!
//! - [`QueueConnection`]: serialized connection with pragmas and migrations
//! - [`DelayQueue`]: queue facade for enqueue, claim, finish, recover
//! - [`queries::delay_queue`]: the raw status-guarded queries

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod queue;

pub use connection::QueueConnection;
pub use queue::DelayQueue;
