//! Property Tests
//!
//! Random operation sequences checked against a per-type counter model.

use crate::common::*;
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashMap;
use wishid::testing::FailPoint;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each successful call returns the model's next value for its type,
    /// regardless of which strategy served it.
    #[test]
    fn ids_follow_per_type_model(ops in vec((0u16..4, any::<bool>()), 1..80)) {
        let store = memory_store();
        let locking = shared_allocator(&store, Strategy::Locking);
        let upsert = shared_allocator(&store, Strategy::Upsert);
        let mut model: HashMap<u16, Id> = HashMap::new();

        for (raw, use_upsert) in ops {
            let allocator = if use_upsert { &upsert } else { &locking };
            let id = allocator.new_id(EntityType::new(raw)).unwrap();
            let expected = model.entry(raw).or_insert(0);
            *expected += 1;
            prop_assert_eq!(id, *expected);
        }

        for (raw, last) in model {
            prop_assert_eq!(store.committed_value(EntityType::new(raw)), Some(last));
        }
    }

    /// Failed calls return no id and do not advance the sequence.
    #[test]
    fn failed_calls_consume_nothing(
        ops in vec((0u16..3, any::<bool>(), 0usize..3), 1..60),
        use_upsert in any::<bool>(),
    ) {
        let store = memory_store();
        let strategy = if use_upsert { Strategy::Upsert } else { Strategy::Locking };
        let allocator = shared_allocator(&store, strategy);
        let points = [FailPoint::Begin, FailPoint::Write, FailPoint::Commit];
        let mut model: HashMap<u16, Id> = HashMap::new();

        for (raw, fail, point) in ops {
            let entity_type = EntityType::new(raw);
            if fail {
                store.faults().fail_next(points[point]);
                prop_assert!(allocator.new_id(entity_type).is_err());
            } else {
                let expected = model.entry(raw).or_insert(0);
                *expected += 1;
                prop_assert_eq!(allocator.new_id(entity_type).unwrap(), *expected);
            }
            prop_assert_eq!(
                store.committed_value(entity_type),
                model.get(&raw).copied()
            );
        }
    }
}
