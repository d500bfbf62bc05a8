//! Counter store implementations for wishid
//!
//! This crate provides the persistent side of id allocation:
//! - MemoryCounterStore: In-process transactional store with per-row locks
//! - SqliteCounterStore: SQLite-backed store shared across processes
//! - testing: Fault injection for failure-atomicity tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod sqlite;
pub mod testing;

pub use memory::{
    LastWriteReporting, MemoryCounterStore, MemoryStoreOptions, MemoryTransaction,
    TransactionStatus, DEFAULT_LOCK_WAIT_TIMEOUT,
};
pub use sqlite::{SqliteCounterStore, SqliteOptions, SqliteTransaction, DEFAULT_BUSY_TIMEOUT};
