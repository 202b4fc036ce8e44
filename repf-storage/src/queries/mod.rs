//! Query functions, grouped by table.

pub mod delay_queue;
