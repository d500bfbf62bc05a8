//! Error types for id allocation
//!
//! Every variant except [`Error::InvalidConfig`] is a store failure: the
//! counter store could not complete the operations an allocation needs, no
//! id is returned, and the failing transaction leaves no row mutation behind.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::EntityType;
use std::io;
use thiserror::Error;

/// Result type alias for allocation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for counter stores and allocators
#[derive(Debug, Error)]
pub enum Error {
    /// Row lock could not be acquired before the lock-wait timeout
    #[error("Lock wait timeout for {entity_type} after {waited_ms}ms")]
    LockWaitTimeout {
        /// Row that could not be locked
        entity_type: EntityType,
        /// How long the transaction waited
        waited_ms: u64,
    },

    /// Backend reported the database as busy or locked
    #[error("Store busy: {0}")]
    Busy(String),

    /// Unique-key violation outside the expected upsert conflict
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Update targeted a counter row that does not exist
    #[error("Counter row not found for {0}")]
    RowNotFound(EntityType),

    /// Counter cannot be incremented any further
    #[error("Counter overflow for {0}")]
    ValueOverflow(EntityType),

    /// Backend has no atomic insert-or-update primitive
    #[error("Upsert not supported by {0} store")]
    UpsertUnsupported(&'static str),

    /// Upsert updated an existing row but the backend reported no resulting value
    #[error("Upsert for {0} took the update branch without reporting the resulting value")]
    UnreportedUpsertValue(EntityType),

    /// Operation on a transaction that already committed or aborted
    #[error("Transaction not active (state: {state})")]
    TransactionNotActive {
        /// Current transaction state
        state: String,
    },

    /// Fault injected by the test harness
    #[error("Injected fault: {0}")]
    InjectedFault(String),

    /// Any other backend driver error
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O error opening or accessing a store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be read, parsed or validated
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the counter store failed to complete the allocation
    pub fn is_store_failure(&self) -> bool {
        !matches!(self, Error::InvalidConfig(_))
    }

    /// Whether a fresh attempt may succeed
    ///
    /// Only contention errors qualify. Allocators never retry on their own;
    /// this is for callers that choose to.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockWaitTimeout { .. } | Error::Busy(_))
    }
}
