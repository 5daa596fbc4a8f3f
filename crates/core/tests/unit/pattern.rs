//! Access-Pattern Predictor Unit Tests.
//!
//! Verifies the bounded history and both prediction rules (mip walk and
//! sequential texture sweep) in isolation from the cache.

use gpu_core::texture::pattern::{PatternTracker, PrefetchHint};

use crate::common::init;

/// No prediction until the two inspected accesses exist.
#[test]
fn insufficient_history_predicts_nothing() {
    init();
    let mut tracker = PatternTracker::new(16);

    assert_eq!(tracker.predict(), None);

    tracker.record(1, 0, 100);
    assert_eq!(tracker.predict(), None, "one access is not a pattern");
}

/// Two accesses to the same texture predict the next mip level.
#[test]
fn mip_walk_predicts_next_mip() {
    init();
    let mut tracker = PatternTracker::new(16);

    tracker.record(42, 0, 100);
    tracker.record(42, 1, 200);

    assert_eq!(
        tracker.predict(),
        Some(PrefetchHint {
            texture_id: 42,
            mip_level: 2
        })
    );
}

/// The mip walk stops predicting at the mip ceiling.
#[test]
fn mip_walk_respects_ceiling() {
    init();
    let mut tracker = PatternTracker::new(16);

    tracker.record(42, 14, 100);
    tracker.record(42, 15, 200);

    assert_eq!(tracker.predict(), None, "mip 16 is never predicted");
}

/// Adjacent texture ids predict the next id at the same mip.
#[test]
fn sequential_ids_predict_next_texture() {
    init();
    let mut tracker = PatternTracker::new(16);

    tracker.record(10, 3, 100);
    tracker.record(11, 3, 200);

    assert_eq!(
        tracker.predict(),
        Some(PrefetchHint {
            texture_id: 12,
            mip_level: 3
        })
    );
}

/// Unrelated consecutive accesses predict nothing.
#[test]
fn unrelated_accesses_predict_nothing() {
    init();
    let mut tracker = PatternTracker::new(16);

    tracker.record(10, 0, 100);
    tracker.record(25, 4, 200);

    assert_eq!(tracker.predict(), None);
}

/// Only the two most recent accesses matter.
#[test]
fn prediction_uses_latest_accesses() {
    init();
    let mut tracker = PatternTracker::new(16);

    tracker.record(10, 0, 100);
    tracker.record(11, 0, 200); // sequential pair...
    tracker.record(99, 5, 300); // ...broken by an unrelated access

    assert_eq!(tracker.predict(), None);
}

/// The history is bounded; the oldest access drops first.
#[test]
fn history_is_bounded() {
    init();
    let mut tracker = PatternTracker::new(3);

    for i in 0..10u64 {
        tracker.record(i, 0, i * 100);
    }

    assert_eq!(tracker.len(), 3);
}
