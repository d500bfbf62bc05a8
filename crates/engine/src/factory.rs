//! Strategy selection and allocator construction
//!
//! Which strategy a deployment uses depends on what its backend can do:
//! `Auto` picks upsert where the store supports it and falls back to row
//! locking everywhere else.

use crate::allocator::{IdAllocator, Strategy};
use crate::config::{AllocatorConfig, StoreConfig};
use crate::locking::LockingAllocator;
use crate::retry::RetryingAllocator;
use crate::upsert::UpsertAllocator;
use std::sync::Arc;
use wishid_core::{CounterStore, Error, Result};
use wishid_storage::{MemoryCounterStore, SqliteCounterStore};

/// Resolve `requested` to a concrete strategy for `store`
///
/// # Errors
///
/// Returns `UpsertUnsupported` if upsert is requested explicitly but the
/// store lacks it.
pub fn resolve_strategy<S: CounterStore>(store: &S, requested: Strategy) -> Result<Strategy> {
    match requested {
        Strategy::Auto if store.supports_upsert() => Ok(Strategy::Upsert),
        Strategy::Auto => Ok(Strategy::Locking),
        Strategy::Upsert if !store.supports_upsert() => {
            Err(Error::UpsertUnsupported(store.backend_name()))
        }
        concrete => Ok(concrete),
    }
}

/// Build an allocator over `store` using `strategy`
pub fn build_allocator<S>(store: Arc<S>, strategy: Strategy) -> Result<Box<dyn IdAllocator>>
where
    S: CounterStore + 'static,
{
    let resolved = resolve_strategy(&*store, strategy)?;
    tracing::info!(
        backend = store.backend_name(),
        requested = %strategy,
        strategy = %resolved,
        "id allocator selected"
    );

    match resolved {
        Strategy::Upsert => Ok(Box::new(UpsertAllocator::new(store)?)),
        _ => Ok(Box::new(LockingAllocator::new(store))),
    }
}

/// Open the configured store and build an allocator over it
///
/// Wraps the allocator in [`RetryingAllocator`] when the config has a
/// `[retry]` section with `max_retries > 0`.
pub fn open_allocator(config: &AllocatorConfig) -> Result<Box<dyn IdAllocator>> {
    config.validate()?;

    let allocator = match &config.store {
        StoreConfig::Memory { .. } => {
            let options = config.store.memory_options().unwrap_or_default();
            build_allocator(
                Arc::new(MemoryCounterStore::with_options(options)),
                config.strategy,
            )?
        }
        StoreConfig::Sqlite { path, .. } => {
            let options = config.store.sqlite_options().unwrap_or_default();
            build_allocator(
                Arc::new(SqliteCounterStore::open(path, options)?),
                config.strategy,
            )?
        }
    };

    match &config.retry {
        Some(retry) if retry.max_retries > 0 => {
            Ok(Box::new(RetryingAllocator::new(allocator, retry.clone())))
        }
        _ => Ok(allocator),
    }
}
