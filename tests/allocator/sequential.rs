//! Sequential Allocation Tests
//!
//! First issuance, strict increments, and independence between entity types.

use crate::common::*;

#[test]
fn first_call_on_empty_store_returns_one_and_creates_row() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);

        assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 1, "{strategy}");
        assert_eq!(store.committed_value(EntityType::WISH), Some(1));

        assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 2, "{strategy}");
        assert_eq!(store.committed_value(EntityType::WISH), Some(2));
    }
}

#[test]
fn kth_sequential_call_returns_k() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);
        for k in 1..=100 {
            assert_eq!(allocator.new_id(EntityType::FOCUS_AREA).unwrap(), k, "{strategy}");
        }
    }
}

#[test]
fn entity_types_have_independent_sequences() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);

        for _ in 0..5 {
            allocator.new_id(EntityType::WISH).unwrap();
        }
        assert_eq!(allocator.new_id(EntityType::FOCUS_AREA).unwrap(), 1);
        assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 6);
        assert_eq!(allocator.new_id(EntityType::FOCUS_AREA).unwrap(), 2);
    }
}

#[test]
fn unknown_entity_type_starts_at_one() {
    for strategy in STRATEGIES {
        let store = memory_store();
        let allocator = shared_allocator(&store, strategy);
        let custom = EntityType::new(500);
        assert!(!custom.is_known());
        assert_eq!(allocator.new_id(custom).unwrap(), 1);
        assert_eq!(allocator.new_id(custom).unwrap(), 2);
    }
}

#[test]
fn strategies_share_one_sequence_per_store() {
    let store = memory_store();
    let locking = shared_allocator(&store, Strategy::Locking);
    let upsert = shared_allocator(&store, Strategy::Upsert);

    let ids: Vec<Id> = (0..10)
        .map(|i| {
            if i % 2 == 0 {
                locking.new_id(EntityType::WISH).unwrap()
            } else {
                upsert.new_id(EntityType::WISH).unwrap()
            }
        })
        .collect();
    assert_eq!(ids, (1..=10).collect::<Vec<Id>>());
}

#[test]
fn exactly_one_row_per_entity_type() {
    let store = memory_store();
    let allocator = shared_allocator(&store, Strategy::Locking);
    for _ in 0..3 {
        allocator.new_id(EntityType::WISH).unwrap();
        allocator.new_id(EntityType::FOCUS_AREA).unwrap();
    }
    let rows = store.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].entity_type, EntityType::WISH);
    assert_eq!(rows[0].value, 3);
    assert_eq!(rows[1].entity_type, EntityType::FOCUS_AREA);
    assert_eq!(rows[1].value, 3);
}

#[test]
fn sqlite_sequence_survives_reopen() {
    for strategy in STRATEGIES {
        let db = TestSqlite::new();
        {
            let allocator = shared_allocator(&db.open(), strategy);
            assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 1);
            assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 2);
        }

        let store = db.open();
        let allocator = shared_allocator(&store, strategy);
        assert_eq!(allocator.new_id(EntityType::WISH).unwrap(), 3);
        assert_eq!(allocator.new_id(EntityType::FOCUS_AREA).unwrap(), 1);
        assert_eq!(store.committed_value(EntityType::WISH).unwrap(), Some(3));
    }
}

#[test]
fn sqlite_strategies_interleave() {
    let db = TestSqlite::new();
    let store = db.open();
    let locking = shared_allocator(&store, Strategy::Locking);
    let upsert = shared_allocator(&store, Strategy::Upsert);

    assert_eq!(upsert.new_id(EntityType::WISH).unwrap(), 1);
    assert_eq!(locking.new_id(EntityType::WISH).unwrap(), 2);
    assert_eq!(upsert.new_id(EntityType::WISH).unwrap(), 3);
}
