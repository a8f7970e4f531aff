//! Property tests for the ordering invariants.
//!
//! Whatever order snapshots arrive in, chains must stay in decreasing
//! timestamp order and every installed snapshot must hold its
//! instances in ascending id order.

use proptest::prelude::*;

use archmeta::record::{encode_indom, HEADER_SIZE, TRAILER_SIZE};
use archmeta::types::MetaConfig;
use archmeta::{MetaStore, Timestamp, Version};

fn snapshot_strategy() -> impl Strategy<Value = (i64, Vec<i32>)> {
    (
        0i64..1000,
        proptest::collection::hash_set(0i32..50, 0..12)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>()),
    )
}

proptest! {
    #[test]
    fn chains_stay_ordered_under_arbitrary_insertion(
        snaps in proptest::collection::vec(snapshot_strategy(), 1..40)
    ) {
        let mut store = MetaStore::new(Version::V3);
        for (sec, ids) in snaps {
            if ids.is_empty() {
                continue;
            }
            let names: Vec<String> = ids.iter().map(|i| format!("inst-{}", i)).collect();
            store.add_indom(7, Timestamp::new(sec, 0), ids, names);
        }

        if let Some(chain) = store.indom_chain(7) {
            // Decreasing timestamps along the chain.
            for pair in chain.windows(2) {
                prop_assert!(pair[0].stamp >= pair[1].stamp);
            }
            for snap in chain {
                // Strictly ascending instance ids within a snapshot,
                // names in lockstep.
                for pair in snap.insts.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
                for (i, &id) in snap.insts.iter().enumerate() {
                    prop_assert_eq!(&snap.names[i], &format!("inst-{}", id));
                }
            }
        }
    }

    #[test]
    fn duplicate_snapshots_never_grow_a_slot(
        sec in 0i64..100,
        ids in proptest::collection::vec(-100i32..100, 1..10),
        repeats in 1usize..5
    ) {
        let mut store = MetaStore::new(Version::V3);
        let names: Vec<String> = ids.iter().map(|i| format!("i{}", i)).collect();
        for _ in 0..=repeats {
            store.add_indom(1, Timestamp::new(sec, 0), ids.clone(), names.clone());
        }
        // However often the same snapshot is replayed, one node per
        // distinct membership.
        let distinct: std::collections::HashSet<Vec<i32>> = store
            .indom_chain(1)
            .unwrap()
            .iter()
            .map(|s| s.insts.clone())
            .collect();
        prop_assert_eq!(store.indom_chain(1).unwrap().len(), distinct.len());
    }

    #[test]
    fn indom_records_round_trip(
        sec in -1000i64..1000,
        nsec in 0u32..1_000_000_000,
        indom in 0u32..0xffff,
        ids in proptest::collection::vec(any::<i32>(), 0..8),
        suffixes in proptest::collection::vec("[a-z]{1,8}", 0..8)
    ) {
        // Pair ids with names, truncating to the shorter list.
        let n = ids.len().min(suffixes.len());
        let ids = &ids[..n];
        let names: Vec<String> = suffixes[..n].to_vec();

        let stamp = Timestamp::new(sec, nsec);
        let bytes = encode_indom(Version::V3, &stamp, indom, ids, &names);

        let payload = &bytes[HEADER_SIZE..bytes.len() - TRAILER_SIZE];
        let cfg = MetaConfig::default();
        let rec = archmeta::record::decode_record(
            archmeta::types::TAG_INDOM, payload, &cfg).unwrap();
        match rec {
            archmeta::record::MetaRecord::InDom { stamp: s, indom: d, insts, names: got } => {
                prop_assert_eq!(s, stamp);
                prop_assert_eq!(d, indom);
                prop_assert_eq!(insts.as_slice(), ids);
                prop_assert_eq!(got, names);
            }
            other => prop_assert!(false, "unexpected record {:?}", other),
        }
    }
}
