//! The id allocation contract
//!
//! An [`IdAllocator`] hands out positive ids, unique per entity type, by
//! round-tripping through a shared [`CounterStore`] on every call. Two
//! strategies implement it:
//!
//! - [`LockingAllocator`](crate::LockingAllocator): lock the row, read, write back
//! - [`UpsertAllocator`](crate::UpsertAllocator): one atomic insert-or-increment
//!
//! Allocators hold no counter state of their own and never retry. A failed
//! call returns the store error unchanged and leaves the counter table as it
//! was.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use wishid_core::{CounterStore, CounterTransaction, EntityType, Id, Result};

/// Allocation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Exclusive row lock, read, then insert or update
    Locking,
    /// Single atomic insert-or-increment statement
    Upsert,
    /// Upsert when the store supports it, locking otherwise
    #[default]
    Auto,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Locking => "locking",
            Strategy::Upsert => "upsert",
            Strategy::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Source of unique, per-type identifiers
pub trait IdAllocator: Send + Sync {
    /// Allocate the next id for `entity_type`
    ///
    /// The returned id is at least 1 and greater than every id previously
    /// returned for the same entity type. Any error is a failed allocation:
    /// no id was issued and the counter table is unchanged.
    fn new_id(&self, entity_type: EntityType) -> Result<Id>;

    /// Concrete strategy in use (never `Auto`)
    fn strategy(&self) -> Strategy;
}

impl<A: IdAllocator + ?Sized> IdAllocator for Box<A> {
    fn new_id(&self, entity_type: EntityType) -> Result<Id> {
        (**self).new_id(entity_type)
    }

    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }
}

impl<A: IdAllocator + ?Sized> IdAllocator for Arc<A> {
    fn new_id(&self, entity_type: EntityType) -> Result<Id> {
        (**self).new_id(entity_type)
    }

    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }
}

/// Run `body` inside one store transaction
///
/// Commits when `body` succeeds. On failure the transaction is rolled back
/// and the original error returned; a failing rollback is only logged, since
/// the store discards the transaction either way.
pub(crate) fn within_transaction<'s, S, F>(store: &'s S, body: F) -> Result<Id>
where
    S: CounterStore,
    F: FnOnce(&mut S::Transaction<'s>) -> Result<Id>,
{
    let mut txn = store.begin()?;
    match body(&mut txn) {
        Ok(id) => {
            txn.commit()?;
            Ok(id)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback() {
                tracing::warn!(
                    backend = store.backend_name(),
                    error = %rollback_err,
                    "rollback after failed allocation also failed"
                );
            }
            Err(err)
        }
    }
}
