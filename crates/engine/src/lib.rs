//! Id allocation engine for wishid
//!
//! Hands out collision-free, per-type identifiers for wishes, focus areas
//! and other entities, backed by a shared counter store.
//!
//! # Strategies
//!
//! | Strategy   | Mechanism                                   | Backend needs            |
//! |------------|---------------------------------------------|--------------------------|
//! | `Locking`  | exclusive row lock, read, insert or update  | row-level locking        |
//! | `Upsert`   | one atomic insert-or-increment statement    | upsert + reported value  |
//!
//! Both are stateless between calls: every allocation is one transaction
//! against the store, and nothing is cached in process.
//!
//! # Example
//!
//! ```ignore
//! use wishid_engine::{build_allocator, Strategy};
//! use wishid_storage::MemoryCounterStore;
//!
//! let allocator = build_allocator(Arc::new(MemoryCounterStore::new()), Strategy::Auto)?;
//! assert_eq!(allocator.new_id(EntityType::WISH)?, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod config;
pub mod factory;
pub mod locking;
pub mod retry;
pub mod upsert;

pub use allocator::{IdAllocator, Strategy};
pub use config::{AllocatorConfig, StoreConfig, CONFIG_FILE_NAME};
pub use factory::{build_allocator, open_allocator, resolve_strategy};
pub use locking::LockingAllocator;
pub use retry::{RetryConfig, RetryingAllocator};
pub use upsert::UpsertAllocator;
