//! Pessimistic allocation: lock the counter row, then read and write it
//!
//! ```text
//! BEGIN
//! SELECT value ... FOR UPDATE      -- blocks other allocators of this type
//! UPDATE value = value + 1         -- or INSERT value = 1 if no row
//! COMMIT                           -- releases the row lock
//! ```
//!
//! The lock is per row, so allocators for different entity types run in
//! parallel. It is held for the whole read-compute-write; a lock wait timeout
//! or deadlock surfaces as an error for the caller to handle.

use crate::allocator::{within_transaction, IdAllocator, Strategy};
use std::sync::Arc;
use wishid_core::{CounterStore, CounterTransaction, EntityType, Error, Id, Result};

/// Allocator using an exclusive row lock; works on any transactional store
#[derive(Debug)]
pub struct LockingAllocator<S> {
    store: Arc<S>,
}

impl<S: CounterStore> LockingAllocator<S> {
    /// Create an allocator over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Underlying counter store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: CounterStore> IdAllocator for LockingAllocator<S> {
    fn new_id(&self, entity_type: EntityType) -> Result<Id> {
        let id = within_transaction(&*self.store, |txn| {
            match txn.select_for_update(entity_type)? {
                Some(current) => {
                    let next = current
                        .checked_add(1)
                        .ok_or(Error::ValueOverflow(entity_type))?;
                    txn.update(entity_type, next)?;
                    Ok(next)
                }
                None => {
                    txn.insert(entity_type, 1)?;
                    Ok(1)
                }
            }
        })?;

        tracing::debug!(
            entity_type = %entity_type,
            id,
            strategy = "locking",
            backend = self.store.backend_name(),
            "allocated id"
        );
        Ok(id)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Locking
    }
}
