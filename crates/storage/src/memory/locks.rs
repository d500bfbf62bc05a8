//! Row lock table
//!
//! Exclusive, per-row locks keyed by entity type. A lock is owned by one
//! transaction id, is re-entrant for that owner, and is held until the owner
//! releases it. Waiters block on a condition variable up to a deadline.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use wishid_core::{EntityType, Error, Result};

/// Exclusive row locks for the in-memory store
#[derive(Debug, Default)]
pub(crate) struct RowLockTable {
    owners: Mutex<HashMap<EntityType, u64>>,
    released: Condvar,
}

impl RowLockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock on `entity_type` for `txn_id`
    ///
    /// Blocks while another transaction owns the row. Fails with
    /// `LockWaitTimeout` once `timeout` elapses.
    pub(crate) fn acquire(
        &self,
        entity_type: EntityType,
        txn_id: u64,
        timeout: Duration,
    ) -> Result<()> {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut owners = self.owners.lock();

        loop {
            match owners.get(&entity_type) {
                None => {
                    owners.insert(entity_type, txn_id);
                    return Ok(());
                }
                Some(&owner) if owner == txn_id => return Ok(()),
                Some(&owner) => {
                    if Instant::now() >= deadline {
                        tracing::debug!(
                            txn_id,
                            owner,
                            entity_type = %entity_type,
                            "row lock wait timed out"
                        );
                        return Err(Error::LockWaitTimeout {
                            entity_type,
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    self.released.wait_until(&mut owners, deadline);
                }
            }
        }
    }

    /// Release the lock on `entity_type` if `txn_id` owns it
    pub(crate) fn release(&self, entity_type: EntityType, txn_id: u64) {
        let mut owners = self.owners.lock();
        if owners.get(&entity_type) == Some(&txn_id) {
            owners.remove(&entity_type);
            self.released.notify_all();
        }
    }

    /// Current owner of the row lock, if any
    pub(crate) fn holder(&self, entity_type: EntityType) -> Option<u64> {
        self.owners.lock().get(&entity_type).copied()
    }
}
