//! wishid - collision-free numeric ids per entity type
//!
//! wishid allocates identifiers for wiki entities such as wishes and focus
//! areas. Each entity type owns an independent sequence starting at 1, and
//! every allocation round-trips through a shared counter store, so separate
//! threads and processes never receive the same id.
//!
//! # Quick Start
//!
//! ```ignore
//! use wishid::{build_allocator, EntityType, MemoryCounterStore, Strategy};
//! use std::sync::Arc;
//!
//! let allocator = build_allocator(Arc::new(MemoryCounterStore::new()), Strategy::Auto)?;
//! assert_eq!(allocator.new_id(EntityType::WISH)?, 1);
//! assert_eq!(allocator.new_id(EntityType::WISH)?, 2);
//! assert_eq!(allocator.new_id(EntityType::FOCUS_AREA)?, 1);
//! ```
//!
//! # Architecture
//!
//! - `wishid-core`: entity types, errors and the counter store contract
//! - `wishid-storage`: in-memory and SQLite counter stores
//! - `wishid-engine`: locking and upsert allocators, configuration

pub use wishid_core::{
    CounterRow, CounterStore, CounterTransaction, EntityType, Error, Id, Result, UpsertBranch,
};
pub use wishid_engine::{
    build_allocator, open_allocator, resolve_strategy, AllocatorConfig, IdAllocator,
    LockingAllocator, RetryConfig, RetryingAllocator, StoreConfig, Strategy, UpsertAllocator,
    CONFIG_FILE_NAME,
};
pub use wishid_storage::{
    testing, LastWriteReporting, MemoryCounterStore, MemoryStoreOptions, SqliteCounterStore,
    SqliteOptions,
};
