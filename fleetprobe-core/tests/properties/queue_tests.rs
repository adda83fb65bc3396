//! Property-based tests for the rotating job queue

use fleetprobe_core::JobQueue;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn rotation_is_strict_from_index_zero(size in 1usize..32, calls in 0usize..400) {
        let queue = JobQueue::new((0..size).collect::<Vec<_>>()).unwrap();

        for i in 0..calls {
            let (index, entry) = queue.next_indexed();
            prop_assert_eq!(index, i % size);
            prop_assert_eq!(*entry, i % size);
        }
    }

    #[test]
    fn every_slot_served_floor_or_ceil(size in 1usize..32, calls in 0usize..400) {
        let queue = JobQueue::new((0..size).collect::<Vec<_>>()).unwrap();
        let mut counts = vec![0usize; size];
        for _ in 0..calls {
            counts[*queue.next()] += 1;
        }

        let floor = calls / size;
        let ceil = calls.div_ceil(size);
        for (slot, count) in counts.iter().enumerate() {
            prop_assert!(
                *count == floor || *count == ceil,
                "slot {} served {} times, expected {} or {}", slot, count, floor, ceil
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn concurrent_callers_never_share_a_dispatch(
        size in 1usize..8,
        threads in 2usize..6,
        per_thread in 1usize..60,
    ) {
        let queue = Arc::new(JobQueue::new((0..size).collect::<Vec<_>>()).unwrap());

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| {
                            let d = queue.next_dispatch();
                            (d.sequence, d.index)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for (sequence, index) in handle.join().unwrap() {
                // Position in the global order fixes the slot handed out.
                prop_assert_eq!(index, (sequence as usize) % size);
                prop_assert!(seen.insert(sequence), "sequence {} observed twice", sequence);
            }
        }
        prop_assert_eq!(seen.len(), threads * per_thread);
    }
}

#[test]
fn empty_queue_is_rejected_at_construction() {
    assert!(JobQueue::<u8>::new(Vec::new()).is_err());
}
