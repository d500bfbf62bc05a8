//! Atomic allocation: one insert-or-increment statement per id
//!
//! ```text
//! BEGIN
//! INSERT (type, 1) ON CONFLICT SET value = value + 1
//! <read the value the store reports for that write>
//! COMMIT
//! ```
//!
//! The read-modify-write happens inside the store as a single statement, so
//! no lock is held across client round trips. This needs a backend with both
//! an upsert primitive and a way to report the value it wrote.
//!
//! ## Resolving the id
//!
//! 1. A non-zero reported value is the id.
//! 2. Nothing reported and the insert branch ran: the id is 1, since the
//!    insert branch only ever writes 1.
//! 3. Nothing reported and an existing row was updated: the id is unknown.
//!    The allocation fails with `UnreportedUpsertValue` and rolls back rather
//!    than guess a value that may already be issued.

use crate::allocator::{within_transaction, IdAllocator, Strategy};
use std::sync::Arc;
use wishid_core::{CounterStore, CounterTransaction, EntityType, Error, Id, Result, UpsertBranch};

/// Allocator using the store's atomic upsert
#[derive(Debug)]
pub struct UpsertAllocator<S> {
    store: Arc<S>,
}

impl<S: CounterStore> UpsertAllocator<S> {
    /// Create an allocator over `store`
    ///
    /// Fails with `UpsertUnsupported` if the store has no upsert primitive.
    pub fn new(store: Arc<S>) -> Result<Self> {
        if !store.supports_upsert() {
            return Err(Error::UpsertUnsupported(store.backend_name()));
        }
        Ok(Self { store })
    }

    /// Underlying counter store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Turn an upsert's outcome into the allocated id
///
/// A reported value of zero counts as "nothing reported", the way
/// session-scoped last-insert-id functions signal it.
pub(crate) fn resolve_upserted_id(
    entity_type: EntityType,
    branch: UpsertBranch,
    reported: Option<Id>,
) -> Result<Id> {
    match (reported.filter(|&value| value != 0), branch) {
        (Some(value), _) => Ok(value),
        (None, UpsertBranch::Inserted) => Ok(1),
        (None, UpsertBranch::Updated) => Err(Error::UnreportedUpsertValue(entity_type)),
    }
}

impl<S: CounterStore> IdAllocator for UpsertAllocator<S> {
    fn new_id(&self, entity_type: EntityType) -> Result<Id> {
        let id = within_transaction(&*self.store, |txn| {
            let branch = txn.upsert_increment(entity_type)?;
            resolve_upserted_id(entity_type, branch, txn.last_write_value())
        })?;

        tracing::debug!(
            entity_type = %entity_type,
            id,
            strategy = "upsert",
            backend = self.store.backend_name(),
            "allocated id"
        );
        Ok(id)
    }

    fn strategy(&self) -> Strategy {
        Strategy::Upsert
    }
}
