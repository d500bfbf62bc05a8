//! Concurrent Allocation Tests
//!
//! No id is ever issued twice, whatever the interleaving.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn concurrent_pair_on_empty_store_gets_one_and_two() {
    for strategy in STRATEGIES {
        for _ in 0..50 {
            let store = memory_store();
            let allocator = shared_allocator(&store, strategy);
            let mut ids = allocate_concurrently(&allocator, EntityType::FOCUS_AREA, 2, 1);
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 2], "{strategy}");
        }
    }
}

#[test]
fn many_callers_get_exactly_one_to_m() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);
        let ids = allocate_concurrently(&allocator, EntityType::WISH, 16, 50);
        assert_dense_unique(&ids, 16 * 50);
        assert_eq!(store.committed_value(EntityType::WISH), Some(800));
    }
}

#[test]
fn mixed_strategies_never_double_issue() {
    let store = memory_store();
    let locking = shared_allocator(&store, Strategy::Locking);
    let upsert = shared_allocator(&store, Strategy::Upsert);

    let a = {
        let locking = Arc::clone(&locking);
        thread::spawn(move || allocate_concurrently(&locking, EntityType::WISH, 4, 50))
    };
    let b = {
        let upsert = Arc::clone(&upsert);
        thread::spawn(move || allocate_concurrently(&upsert, EntityType::WISH, 4, 50))
    };

    let mut ids = a.join().unwrap();
    ids.extend(b.join().unwrap());
    assert_dense_unique(&ids, 400);
}

#[test]
fn concurrent_types_stay_independent() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);

        let handles: Vec<_> = (0..4u16)
            .map(|raw| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    allocate_concurrently(&allocator, EntityType::new(raw), 4, 25)
                })
            })
            .collect();

        for handle in handles {
            assert_dense_unique(&handle.join().unwrap(), 100);
        }
    }
}

#[test]
fn row_lock_does_not_block_other_types() {
    let store = memory_store_with(
        MemoryStoreOptions::default().with_lock_wait_timeout(Duration::from_millis(100)),
    );
    let allocator = shared_allocator(&store, Strategy::Locking);
    allocator.new_id(EntityType::WISH).unwrap();

    // An open transaction holds the WISH row lock
    let mut holder = store.begin().unwrap();
    assert_eq!(holder.select_for_update(EntityType::WISH).unwrap(), Some(1));

    let start = Instant::now();
    assert_eq!(allocator.new_id(EntityType::FOCUS_AREA).unwrap(), 1);
    assert!(start.elapsed() < Duration::from_millis(100));

    let err = allocator.new_id(EntityType::WISH).unwrap_err();
    assert!(matches!(err, Error::LockWaitTimeout { .. }), "{err}");
    assert!(err.is_retryable());

    holder.rollback().unwrap();
    assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 2);
}

#[test]
fn blocked_caller_proceeds_after_lock_release() {
    let store = memory_store();
    let allocator = shared_allocator(&store, Strategy::Locking);

    let mut holder = store.begin().unwrap();
    holder.insert(EntityType::WISH, 10).unwrap();

    let waiter = {
        let allocator = Arc::clone(&allocator);
        thread::spawn(move || allocator.new_id(EntityType::WISH))
    };

    thread::sleep(Duration::from_millis(30));
    holder.commit().unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), 11);
}

#[test]
fn sqlite_connections_never_double_issue() {
    for strategy in STRATEGIES {
        let db = TestSqlite::new();
        let threads = 6;
        let per_thread = 20;

        // One connection per thread, as separate processes would have
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let allocator = shared_allocator(&db.open(), strategy);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| allocator.new_id(EntityType::WISH).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<Id> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_dense_unique(&ids, threads * per_thread);
        assert_eq!(
            db.open().committed_value(EntityType::WISH).unwrap(),
            Some((threads * per_thread) as Id)
        );
    }
}

/// High contention throughput, opt-in
/// Run with: cargo test --test allocator concurrent -- --ignored
#[test]
#[ignore]
fn stress_high_contention() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);
        let start = Instant::now();
        let ids = allocate_concurrently(&allocator, EntityType::WISH, 32, 2_000);
        println!("{strategy}: 64000 ids in {:?}", start.elapsed());
        assert_dense_unique(&ids, 64_000);
    }
}
