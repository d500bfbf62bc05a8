//! Counter store contract
//!
//! Allocators talk to persistent storage exclusively through these traits.
//! A store hands out transactions; a transaction exposes the handful of
//! row-level primitives the allocation strategies are built from:
//!
//! - `select_for_update`: read a counter while taking its exclusive row lock
//! - `insert` / `update`: plain row writes
//! - `upsert_increment`: atomic insert-1-or-increment, keyed by entity type
//! - `last_write_value`: the session-scoped value reported by the last upsert
//!
//! Transactions are single-use. `commit` and `rollback` consume them, and
//! dropping one that is still active must roll it back.

use crate::error::Result;
use crate::types::{EntityType, Id, UpsertBranch};

/// Shared persistent counter table
///
/// Implementations must be safe to share between threads; each call to
/// [`CounterStore::begin`] starts an independent transaction.
pub trait CounterStore: Send + Sync {
    /// Transaction type handed out by this store
    type Transaction<'a>: CounterTransaction
    where
        Self: 'a;

    /// Begin a transaction
    fn begin(&self) -> Result<Self::Transaction<'_>>;

    /// Short backend name for logs and errors
    fn backend_name(&self) -> &'static str;

    /// Whether transactions support [`CounterTransaction::upsert_increment`]
    fn supports_upsert(&self) -> bool;
}

/// One transaction against the counter table
pub trait CounterTransaction {
    /// Read the counter for `entity_type`, holding its row lock until the
    /// transaction ends
    ///
    /// Returns `None` if no row exists yet.
    fn select_for_update(&mut self, entity_type: EntityType) -> Result<Option<Id>>;

    /// Insert a new counter row
    ///
    /// Fails with [`crate::Error::ConstraintViolation`] if the row exists.
    fn insert(&mut self, entity_type: EntityType, value: Id) -> Result<()>;

    /// Overwrite an existing counter row
    ///
    /// Fails with [`crate::Error::RowNotFound`] if the row is missing.
    fn update(&mut self, entity_type: EntityType, value: Id) -> Result<()>;

    /// Insert `{entity_type, 1}`, or on conflict set `value = value + 1`,
    /// as one atomic statement
    ///
    /// Backends without the primitive return [`crate::Error::UpsertUnsupported`].
    fn upsert_increment(&mut self, entity_type: EntityType) -> Result<UpsertBranch>;

    /// Value reported by the most recent upsert in this transaction
    ///
    /// `None` when the backend reported nothing for that statement.
    fn last_write_value(&self) -> Option<Id> {
        None
    }

    /// Make all writes durable and visible, releasing row locks
    fn commit(self) -> Result<()>
    where
        Self: Sized;

    /// Discard all writes, releasing row locks
    fn rollback(self) -> Result<()>
    where
        Self: Sized;
}
