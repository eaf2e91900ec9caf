//! Property tests for hysteresis, buckets and engine bookkeeping

mod common;

use adjacency_core::proximity::{evaluate, ProximityTracker};
use adjacency_core::{BucketTable, Transition};
use proptest::prelude::*;

use common::Pair;

fn thresholds() -> impl Strategy<Value = (f64, f64)> {
    (1.0f64..5_000.0, 1.0f64..2_000.0).prop_map(|(entry, gap)| (entry, entry + gap))
}

proptest! {
    #[test]
    fn prop_band_never_flaps(
        (entry, exit) in thresholds(),
        fractions in prop::collection::vec(0.0f64..0.99, 1..40),
    ) {
        let mut tracker = ProximityTracker::new();
        prop_assert_eq!(tracker.step(entry, entry, exit, 0), Transition::Entered);

        for (i, f) in fractions.into_iter().enumerate() {
            let distance = entry + f * (exit - entry);
            let transition = tracker.step(distance, entry, exit, i as u64 + 1);
            prop_assert_eq!(transition, Transition::Stayed);
        }
    }

    #[test]
    fn prop_band_never_enters_from_outside(
        (entry, exit) in thresholds(),
        fractions in prop::collection::vec(0.0f64..0.99, 1..40),
    ) {
        let mut tracker = ProximityTracker::new();
        for (i, f) in fractions.into_iter().enumerate() {
            // Strictly above entry
            let distance = entry + (f * (exit - entry)).max(f64::EPSILON * entry * 4.0);
            prop_assert_eq!(tracker.step(distance, entry, exit, i as u64), Transition::Idle);
        }
    }

    #[test]
    fn prop_boundaries((entry, exit) in thresholds()) {
        prop_assert!(evaluate(false, entry, entry, exit));
        prop_assert!(!evaluate(true, exit, entry, exit));
    }

    #[test]
    fn prop_buckets_are_monotone(a in 0.0f64..20_000.0, b in 0.0f64..20_000.0) {
        let table = BucketTable::default();
        let names: Vec<_> = table.iter().map(|bucket| bucket.name).collect();
        let rank = |d: f64| names.iter().position(|n| *n == table.classify(d));

        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(low) <= rank(high));
    }

    #[test]
    fn prop_engine_invariants(distances in prop::collection::vec(0.0f64..1_800.0, 1..30)) {
        let mut pair = Pair::ungated();
        let mut last_entered = None;

        for distance in distances {
            let outcome = pair.step(60, distance);
            let state = pair.engine.state();

            prop_assert!(outcome.is_valid());
            if state.proximity_update_count() > 0 {
                prop_assert!(state.proximity());
            }
            prop_assert_eq!(state.tracker.since.is_some(), state.proximity());

            if outcome.transition() == Some(Transition::Entered) {
                last_entered = state.tracker.last_entered;
            }
            prop_assert_eq!(state.tracker.last_entered, last_entered);
        }
    }
}

#[test]
fn default_bucket_examples() {
    let table = BucketTable::default();
    assert_eq!(table.classify(49.0), "very_near");
    assert_eq!(table.classify(50.0), "near");
    assert_eq!(table.classify(10_000.0), "very_far");
}
