//! Upsert Reporting Tests
//!
//! How the upsert strategy resolves ids depending on what the backend
//! reports for the write it just made.

use crate::common::*;

fn store_reporting(reporting: LastWriteReporting) -> std::sync::Arc<MemoryCounterStore> {
    memory_store_with(MemoryStoreOptions::default().with_last_write_reporting(reporting))
}

#[test]
fn resulting_value_reporting_allocates_every_id() {
    let store = store_reporting(LastWriteReporting::ResultingValue);
    let allocator = shared_allocator(&store, Strategy::Upsert);
    let ids: Vec<Id> = (0..5).map(|_| allocator.new_id(EntityType::WISH).unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn missing_report_on_insert_defaults_to_one() {
    for reporting in [LastWriteReporting::InsertOnly, LastWriteReporting::Never] {
        let store = store_reporting(reporting);
        let allocator = shared_allocator(&store, Strategy::Upsert);
        assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 1, "{reporting:?}");
    }
}

#[test]
fn missing_report_on_update_fails_instead_of_reissuing() {
    for reporting in [LastWriteReporting::InsertOnly, LastWriteReporting::Never] {
        let store = store_reporting(reporting);
        let allocator = shared_allocator(&store, Strategy::Upsert);
        allocator.new_id(EntityType::WISH).unwrap();

        let err = allocator.new_id(EntityType::WISH).unwrap_err();
        assert!(
            matches!(err, Error::UnreportedUpsertValue(t) if t == EntityType::WISH),
            "{reporting:?}: {err}"
        );
        assert!(err.is_store_failure());
        assert!(!err.is_retryable());
        assert_eq!(store.committed_value(EntityType::WISH), Some(1));
    }
}

#[test]
fn auto_strategy_on_weak_reporting_store_still_picks_upsert() {
    // Reporting quality is not a capability flag; deployments on such
    // backends should configure the locking strategy explicitly.
    let store = store_reporting(LastWriteReporting::Never);
    let auto = shared_allocator(&store, Strategy::Auto);
    assert_eq!(auto.strategy(), Strategy::Upsert);

    let locking = shared_allocator(&store, Strategy::Locking);
    for k in 1..=3 {
        assert_eq!(locking.new_id(EntityType::WISH).unwrap(), k);
    }
}

#[test]
fn store_without_upsert_falls_back_to_locking() {
    let store = memory_store_with(MemoryStoreOptions::default().without_upsert());
    let allocator = shared_allocator(&store, Strategy::Auto);
    assert_eq!(allocator.strategy(), Strategy::Locking);
    assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 1);

    let err = build_allocator(store, Strategy::Upsert).err().unwrap();
    assert!(matches!(err, Error::UpsertUnsupported("memory")));
}
