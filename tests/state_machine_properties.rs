//! Property test for the data-node status invariant (spec §8): status rank
//! is non-decreasing across any sequence of writes, and `setCompleted`
//! always lands on COMPLETED regardless of how many writes preceded it.

use proptest::prelude::*;

use flowdrop_core::prelude::*;

fn chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 1..6)
}

proptest! {
    #[test]
    fn status_rank_never_decreases_across_writes(chunks in chunks()) {
        let node = DataNode::new("oid-prop", "uid-prop1", IoHandle::Memory(MemoryBackend::new("uid-prop1")), NodeOptions::default());
        let mut last_rank = node.status().rank().expect("INITIALIZED has a rank");

        for chunk in &chunks {
            node.write(chunk).unwrap();
            let rank = node.status().rank().expect("writes never leave the non-terminal trio");
            prop_assert!(rank >= last_rank);
            last_rank = rank;
        }

        node.set_completed().unwrap();
        prop_assert_eq!(node.status(), DataStatus::Completed);

        let written: usize = chunks.iter().map(Vec::len).sum();
        prop_assert_eq!(node.size(), written as i64);
    }

    #[test]
    fn write_after_completed_is_always_rejected(chunk in prop::collection::vec(any::<u8>(), 0..8)) {
        let node = DataNode::new("oid-prop2", "uid-prop2", IoHandle::Memory(MemoryBackend::new("uid-prop2")), NodeOptions::default());
        node.set_completed().unwrap();
        prop_assert!(node.write(&chunk).is_err());
    }
}
