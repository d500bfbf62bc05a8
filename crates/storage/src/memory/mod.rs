//! In-memory transactional counter store
//!
//! Committed rows live in a concurrent map; every transaction takes exclusive
//! row locks before reading for update or writing, buffers its writes, and
//! applies them at commit. This gives the same guarantees as a relational
//! backend with row-level locking:
//!
//! - Transactions touching the same entity type serialize on its row lock
//! - Transactions touching different entity types never block each other
//! - Aborted or dropped transactions leave committed rows unchanged
//!
//! The store can also imitate backend quirks: whether upsert is available at
//! all, and how much an upsert reports back through
//! [`CounterTransaction::last_write_value`](wishid_core::CounterTransaction::last_write_value).

mod locks;
mod transaction;

pub use transaction::{MemoryTransaction, TransactionStatus};

use crate::testing::{FailPoint, FaultInjector};
use dashmap::DashMap;
use locks::RowLockTable;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wishid_core::{CounterRow, CounterStore, EntityType, Id, Result};

/// Default time a transaction waits for a contended row lock
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// What an upsert reports as its last-write value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastWriteReporting {
    /// Post-write value on both branches (`LAST_INSERT_ID(expr)` style)
    #[default]
    ResultingValue,
    /// Post-write value on insert; zero when an existing row was updated
    InsertOnly,
    /// Nothing is ever reported
    Never,
}

/// Tuning knobs for [`MemoryCounterStore`]
#[derive(Debug, Clone)]
pub struct MemoryStoreOptions {
    /// Maximum wait for a contended row lock
    pub lock_wait_timeout: Duration,
    /// Upsert reporting behavior
    pub last_write_reporting: LastWriteReporting,
    /// Whether the upsert primitive is available
    pub upsert_enabled: bool,
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self {
            lock_wait_timeout: DEFAULT_LOCK_WAIT_TIMEOUT,
            last_write_reporting: LastWriteReporting::default(),
            upsert_enabled: true,
        }
    }
}

impl MemoryStoreOptions {
    /// Set the row lock wait timeout
    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = timeout;
        self
    }

    /// Set upsert reporting behavior
    pub fn with_last_write_reporting(mut self, reporting: LastWriteReporting) -> Self {
        self.last_write_reporting = reporting;
        self
    }

    /// Disable the upsert primitive, as on backends without one
    pub fn without_upsert(mut self) -> Self {
        self.upsert_enabled = false;
        self
    }
}

/// Counter table held in process memory
///
/// Share it between threads behind an `Arc`; each `begin()` starts an
/// independent transaction.
#[derive(Debug)]
pub struct MemoryCounterStore {
    rows: DashMap<EntityType, Id>,
    locks: RowLockTable,
    faults: FaultInjector,
    options: MemoryStoreOptions,
    next_txn_id: AtomicU64,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCounterStore {
    /// Create an empty store with default options
    pub fn new() -> Self {
        Self::with_options(MemoryStoreOptions::default())
    }

    /// Create an empty store
    pub fn with_options(options: MemoryStoreOptions) -> Self {
        Self {
            rows: DashMap::new(),
            locks: RowLockTable::new(),
            faults: FaultInjector::new(),
            options,
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Store options
    pub fn options(&self) -> &MemoryStoreOptions {
        &self.options
    }

    /// Fault injection hooks
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Committed counter value for `entity_type`
    ///
    /// Inspection for tests and maintenance tooling; allocators never read
    /// outside a transaction.
    pub fn committed_value(&self, entity_type: EntityType) -> Option<Id> {
        self.rows.get(&entity_type).map(|value| *value)
    }

    /// All committed rows, ordered by entity type
    pub fn rows(&self) -> Vec<CounterRow> {
        let mut rows: Vec<CounterRow> = self
            .rows
            .iter()
            .map(|entry| CounterRow::new(*entry.key(), *entry.value()))
            .collect();
        rows.sort_by_key(|row| row.entity_type);
        rows
    }

    /// Transaction currently holding the row lock for `entity_type`
    pub fn lock_holder(&self, entity_type: EntityType) -> Option<u64> {
        self.locks.holder(entity_type)
    }

    fn allocate_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl CounterStore for MemoryCounterStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>> {
        self.faults.check(FailPoint::Begin)?;
        let txn_id = self.allocate_txn_id();
        tracing::trace!(txn_id, "memory transaction started");
        Ok(MemoryTransaction::new(self, txn_id))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn supports_upsert(&self) -> bool {
        self.options.upsert_enabled
    }
}
