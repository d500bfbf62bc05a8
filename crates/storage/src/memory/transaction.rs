//! Transactions against the in-memory counter store
//!
//! A transaction moves through `Active -> Committed` or `Active -> Aborted`.
//! Row locks are taken lazily by the first operation touching a row and held
//! until the transaction ends. Writes go to a private write set and only reach
//! the committed rows in `commit`.

use super::{LastWriteReporting, MemoryCounterStore};
use crate::testing::FailPoint;
use std::collections::BTreeMap;
use wishid_core::{CounterTransaction, EntityType, Error, Id, Result, UpsertBranch};

/// Lifecycle state of a [`MemoryTransaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Writes applied, locks released
    Committed,
    /// Writes discarded, locks released
    Aborted {
        /// Why the transaction ended
        reason: String,
    },
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Active => write!(f, "active"),
            TransactionStatus::Committed => write!(f, "committed"),
            TransactionStatus::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// Transaction handed out by [`MemoryCounterStore::begin`](wishid_core::CounterStore::begin)
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryCounterStore,
    txn_id: u64,
    status: TransactionStatus,
    held_locks: Vec<EntityType>,
    write_set: BTreeMap<EntityType, Id>,
    last_write_value: Option<Id>,
}

impl<'a> MemoryTransaction<'a> {
    pub(super) fn new(store: &'a MemoryCounterStore, txn_id: u64) -> Self {
        Self {
            store,
            txn_id,
            status: TransactionStatus::Active,
            held_locks: Vec::new(),
            write_set: BTreeMap::new(),
            last_write_value: None,
        }
    }

    /// Store-unique transaction id
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Current lifecycle state
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Number of buffered row writes
    pub fn pending_writes(&self) -> usize {
        self.write_set.len()
    }

    fn ensure_active(&self) -> Result<()> {
        match self.status {
            TransactionStatus::Active => Ok(()),
            ref other => Err(Error::TransactionNotActive {
                state: other.to_string(),
            }),
        }
    }

    fn lock_row(&mut self, entity_type: EntityType) -> Result<()> {
        if self.held_locks.contains(&entity_type) {
            return Ok(());
        }
        self.store
            .locks
            .acquire(entity_type, self.txn_id, self.store.options.lock_wait_timeout)?;
        self.held_locks.push(entity_type);
        Ok(())
    }

    /// Value as seen by this transaction: own writes first, then committed rows
    fn current_value(&self, entity_type: EntityType) -> Option<Id> {
        self.write_set
            .get(&entity_type)
            .copied()
            .or_else(|| self.store.committed_value(entity_type))
    }

    fn release_locks(&mut self) {
        for entity_type in self.held_locks.drain(..) {
            self.store.locks.release(entity_type, self.txn_id);
        }
    }

    fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(
            txn_id = self.txn_id,
            discarded = self.write_set.len(),
            reason = %reason,
            "memory transaction aborted"
        );
        self.write_set.clear();
        self.release_locks();
        self.status = TransactionStatus::Aborted { reason };
    }
}

impl CounterTransaction for MemoryTransaction<'_> {
    fn select_for_update(&mut self, entity_type: EntityType) -> Result<Option<Id>> {
        self.ensure_active()?;
        self.lock_row(entity_type)?;
        self.store.faults.check(FailPoint::LockedRead)?;
        Ok(self.current_value(entity_type))
    }

    fn insert(&mut self, entity_type: EntityType, value: Id) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(entity_type)?;
        self.store.faults.check(FailPoint::Write)?;
        if self.current_value(entity_type).is_some() {
            return Err(Error::ConstraintViolation(format!(
                "counter row for {} already exists",
                entity_type
            )));
        }
        self.write_set.insert(entity_type, value);
        Ok(())
    }

    fn update(&mut self, entity_type: EntityType, value: Id) -> Result<()> {
        self.ensure_active()?;
        self.lock_row(entity_type)?;
        self.store.faults.check(FailPoint::Write)?;
        if self.current_value(entity_type).is_none() {
            return Err(Error::RowNotFound(entity_type));
        }
        self.write_set.insert(entity_type, value);
        Ok(())
    }

    fn upsert_increment(&mut self, entity_type: EntityType) -> Result<UpsertBranch> {
        if !self.store.options.upsert_enabled {
            return Err(Error::UpsertUnsupported("memory"));
        }
        self.ensure_active()?;
        self.lock_row(entity_type)?;
        self.store.faults.check(FailPoint::Write)?;

        let (branch, value) = match self.current_value(entity_type) {
            None => (UpsertBranch::Inserted, 1),
            Some(current) => {
                let next = current
                    .checked_add(1)
                    .ok_or(Error::ValueOverflow(entity_type))?;
                (UpsertBranch::Updated, next)
            }
        };
        self.write_set.insert(entity_type, value);

        self.last_write_value = match (self.store.options.last_write_reporting, branch) {
            (LastWriteReporting::ResultingValue, _) => Some(value),
            (LastWriteReporting::InsertOnly, UpsertBranch::Inserted) => Some(value),
            (LastWriteReporting::InsertOnly, UpsertBranch::Updated) => Some(0),
            (LastWriteReporting::Never, _) => None,
        };
        Ok(branch)
    }

    fn last_write_value(&self) -> Option<Id> {
        self.last_write_value
    }

    fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        if let Err(e) = self.store.faults.check(FailPoint::Commit) {
            self.abort(format!("commit failed: {}", e));
            return Err(e);
        }

        let applied = self.write_set.len();
        for (entity_type, value) in std::mem::take(&mut self.write_set) {
            self.store.rows.insert(entity_type, value);
        }
        self.release_locks();
        self.status = TransactionStatus::Committed;
        tracing::trace!(txn_id = self.txn_id, applied, "memory transaction committed");
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        self.abort("rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            self.abort("dropped without commit");
        }
    }
}
