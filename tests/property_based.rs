//! Property-based tests for the sample store and the approximate median.
//!
//! Core properties:
//! 1. Store occupancy never exceeds capacity, whatever gets recorded
//! 2. The approximate median is bounded by the extremes of its input
//! 3. Degenerate median inputs (one and two elements) are exact
//! 4. Identical stacks accumulate their total weight
//! 5. Eviction partitions entries cleanly around the median: everything
//!    kept outweighs everything dropped, the heaviest entry always
//!    survives and the lightest never does

use proptest::prelude::*;

use muestra::evict::approximate_median;
use muestra::frames::FrameId;
use muestra::store::SampleStore;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_occupancy_never_exceeds_capacity(
        capacity in 1usize..12,
        ops in prop::collection::vec(
            (prop::collection::vec(1u64..500, 0..6), 0u64..1_000),
            0..60,
        ),
    ) {
        // Property: no sequence of records can grow the store past its
        // fixed capacity; eviction must keep occupancy bounded.
        let mut store = SampleStore::new(capacity, 8);
        for (raw_frames, weight) in ops {
            let frames: Vec<FrameId> =
                raw_frames.iter().map(|&raw| FrameId::new(raw)).collect();
            store.record(frames.as_slice(), weight);
            assert!(store.len() <= capacity);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_median_is_bounded_by_the_extremes(
        weights in prop::collection::vec(any::<u64>(), 1..200),
    ) {
        // Property: the approximation may be off but can never leave the
        // observed range.
        let median = approximate_median(&weights);
        let min = *weights.iter().min().unwrap();
        let max = *weights.iter().max().unwrap();
        assert!(median >= min);
        assert!(median <= max);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_median_of_one_is_exact(weight in any::<u64>()) {
        assert_eq!(approximate_median(&[weight]), weight);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_median_of_two_is_the_floored_mean(a in any::<u64>(), b in any::<u64>()) {
        // Property: the two-element case is the integer mean, computed
        // without overflowing even near u64::MAX.
        let expected = ((u128::from(a) + u128::from(b)) / 2) as u64;
        assert_eq!(approximate_median(&[a, b]), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_identical_stacks_accumulate_their_sum(
        weights in prop::collection::vec(0u64..1_000, 1..50),
    ) {
        let mut store = SampleStore::new(4, 4);
        let stack = [FrameId::new(7), FrameId::new(8)];
        for &weight in &weights {
            store.record(&stack[..], weight);
        }
        let expected: u64 = weights.iter().sum();
        assert_eq!(store.len(), 1);
        assert_eq!(store.weight_of(&stack), Some(expected));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_eviction_partitions_around_the_median(
        weight_set in prop::collection::hash_set(1u64..1_000_000, 5..40),
    ) {
        // Property: with all-distinct weights, a full store plus one new
        // stack evicts exactly the entries at or below the median. Every
        // survivor outweighs every casualty, the heaviest entry always
        // survives, the lightest is always dropped.
        let weights: Vec<u64> = weight_set.into_iter().collect();
        let capacity = weights.len();

        let mut store = SampleStore::new(capacity, 4);
        for (i, &weight) in weights.iter().enumerate() {
            let stack = [FrameId::new(i as u64 + 1)];
            store.record(&stack[..], weight);
        }
        assert!(store.is_full());

        let trigger = [FrameId::new(capacity as u64 + 1)];
        store.record(&trigger[..], 1);
        assert_eq!(store.weight_of(&trigger), Some(1));

        let mut retained = Vec::new();
        let mut evicted = Vec::new();
        for (i, &weight) in weights.iter().enumerate() {
            let stack = [FrameId::new(i as u64 + 1)];
            match store.weight_of(&stack) {
                Some(stored) => {
                    assert_eq!(stored, weight);
                    retained.push(weight);
                }
                None => evicted.push(weight),
            }
        }

        let heaviest = *weights.iter().max().unwrap();
        let lightest = *weights.iter().min().unwrap();
        assert!(retained.contains(&heaviest));
        assert!(evicted.contains(&lightest));

        let min_retained = *retained.iter().min().unwrap();
        let max_evicted = *evicted.iter().max().unwrap();
        assert!(min_retained > max_evicted);
    }
}
