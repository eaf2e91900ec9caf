//! Proximity Evaluation
//!
//! ## Hysteresis
//!
//! A single threshold flaps whenever GPS jitter carries the distance back and
//! forth across it. Two thresholds fix that:
//!
//! ```text
//!   distance ─────────────────────────────────────────────►
//!   0            entry (500 m)        exit (700 m)
//!   │◄── enter ──►│◄──── keep current ───►│◄──── leave ───►
//! ```
//!
//! - not in proximity: enter when `distance <= entry`
//! - in proximity: stay while `distance < exit`
//!
//! `exit >= entry` is enforced when the configuration is built.
//!
//! ## Buckets
//!
//! Coarse named distance bands for dashboards and automations. A table is a
//! short ascending list of exclusive upper bounds ending in a catch-all.

use heapless::Vec;

use crate::constants::defaults::{DEFAULT_BUCKETS, MAX_BUCKETS};
use crate::errors::BucketError;
use crate::time::Timestamp;

/// Apply the hysteresis rule
#[inline]
pub fn evaluate(previous: bool, distance_m: f64, entry_m: f64, exit_m: f64) -> bool {
    if previous {
        distance_m < exit_m
    } else {
        distance_m <= entry_m
    }
}

/// Named distance band with an exclusive upper bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Exclusive upper bound in meters
    pub upper_m: f64,
    /// Band name
    pub name: &'static str,
}

/// Validated, bounded list of distance buckets
#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    buckets: Vec<Bucket, MAX_BUCKETS>,
}

impl Default for BucketTable {
    fn default() -> Self {
        let mut buckets = Vec::new();
        for (upper_m, name) in DEFAULT_BUCKETS {
            // DEFAULT_BUCKETS is shorter than MAX_BUCKETS
            let _ = buckets.push(Bucket { upper_m, name });
        }
        Self { buckets }
    }
}

impl BucketTable {
    /// Build from `(upper_bound_m, name)` pairs
    ///
    /// Bounds must ascend strictly and the last one must be infinite.
    pub fn new(pairs: &[(f64, &'static str)]) -> Result<Self, BucketError> {
        if pairs.is_empty() {
            return Err(BucketError::Empty);
        }
        if pairs.len() > MAX_BUCKETS {
            return Err(BucketError::TooMany { max: MAX_BUCKETS });
        }

        let mut buckets = Vec::new();
        let mut last = f64::NEG_INFINITY;
        for &(upper_m, name) in pairs {
            if upper_m.is_nan() || upper_m <= last {
                return Err(BucketError::NotAscending);
            }
            last = upper_m;
            buckets
                .push(Bucket { upper_m, name })
                .map_err(|_| BucketError::TooMany { max: MAX_BUCKETS })?;
        }

        if last != f64::INFINITY {
            return Err(BucketError::NoCatchAll);
        }

        Ok(Self { buckets })
    }

    /// Name of the first bucket whose bound exceeds `distance_m`
    pub fn classify(&self, distance_m: f64) -> &'static str {
        self.buckets
            .iter()
            .find(|bucket| distance_m < bucket.upper_m)
            .or(self.buckets.last())
            .map_or("", |bucket| bucket.name)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }
}

/// What a hysteresis step did to the proximity flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// false → true
    Entered,
    /// true → false
    Left,
    /// true → true
    Stayed,
    /// false → false
    Idle,
}

impl Transition {
    /// Proximity flag after the step
    pub fn proximity(&self) -> bool {
        matches!(self, Self::Entered | Self::Stayed)
    }

    /// Whether the flag changed
    pub fn changed(&self) -> bool {
        matches!(self, Self::Entered | Self::Left)
    }
}

/// Proximity flag plus the bookkeeping that goes with it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityTracker {
    /// Current hysteresis state
    pub proximity: bool,
    /// Accepted cycles since proximity was entered, zero outside proximity
    pub update_count: u32,
    /// Last flip in either direction
    pub last_changed: Option<Timestamp>,
    /// Last false → true flip
    pub last_entered: Option<Timestamp>,
    /// Last true → false flip
    pub last_left: Option<Timestamp>,
    /// Start of the current proximity period
    pub since: Option<Timestamp>,
}

impl ProximityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one valid distance and stamp the transition at `now`
    pub fn step(&mut self, distance_m: f64, entry_m: f64, exit_m: f64, now: Timestamp) -> Transition {
        let next = evaluate(self.proximity, distance_m, entry_m, exit_m);

        let transition = match (self.proximity, next) {
            (false, true) => {
                self.last_changed = Some(now);
                self.last_entered = Some(now);
                self.update_count = 1;
                self.since = Some(now);
                Transition::Entered
            }
            (true, false) => {
                self.last_changed = Some(now);
                self.last_left = Some(now);
                self.update_count = 0;
                self.since = None;
                Transition::Left
            }
            (true, true) => {
                self.update_count = self.update_count.saturating_add(1);
                Transition::Stayed
            }
            (false, false) => Transition::Idle,
        };

        self.proximity = next;
        transition
    }

    /// Time spent in the current proximity period, in milliseconds
    pub fn duration_ms(&self, now: Timestamp) -> Option<u64> {
        self.since.map(|since| now.saturating_sub(since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_boundaries() {
        assert!(evaluate(false, 500.0, 500.0, 700.0));
        assert!(!evaluate(false, 500.1, 500.0, 700.0));
        assert!(evaluate(true, 699.9, 500.0, 700.0));
        assert!(!evaluate(true, 700.0, 500.0, 700.0));
    }

    #[test]
    fn default_buckets() {
        let table = BucketTable::default();
        assert_eq!(table.len(), 5);
        assert_eq!(table.classify(0.0), "very_near");
        assert_eq!(table.classify(49.99), "very_near");
        assert_eq!(table.classify(50.0), "near");
        assert_eq!(table.classify(999.0), "mid");
        assert_eq!(table.classify(1000.0), "far");
        assert_eq!(table.classify(4999.0), "far");
        assert_eq!(table.classify(5000.0), "very_far");
        assert_eq!(table.classify(1.0e9), "very_far");
    }

    #[test]
    fn bucket_table_validation() {
        assert_eq!(BucketTable::new(&[]), Err(BucketError::Empty));
        assert_eq!(
            BucketTable::new(&[(100.0, "a"), (100.0, "b"), (f64::INFINITY, "c")]),
            Err(BucketError::NotAscending)
        );
        assert_eq!(
            BucketTable::new(&[(100.0, "a"), (200.0, "b")]),
            Err(BucketError::NoCatchAll)
        );
        let too_many = [(1.0, "x"); 9];
        assert_eq!(BucketTable::new(&too_many), Err(BucketError::TooMany { max: MAX_BUCKETS }));

        let table = BucketTable::new(&[(10.0, "here"), (f64::INFINITY, "elsewhere")]).unwrap();
        assert_eq!(table.classify(10.0), "elsewhere");
    }

    #[test]
    fn tracker_enter_stay_leave() {
        let mut tracker = ProximityTracker::new();

        assert_eq!(tracker.step(800.0, 500.0, 700.0, 1_000), Transition::Idle);
        assert_eq!(tracker.last_changed, None);

        assert_eq!(tracker.step(450.0, 500.0, 700.0, 2_000), Transition::Entered);
        assert_eq!(tracker.update_count, 1);
        assert_eq!(tracker.last_entered, Some(2_000));
        assert_eq!(tracker.since, Some(2_000));

        assert_eq!(tracker.step(650.0, 500.0, 700.0, 3_000), Transition::Stayed);
        assert_eq!(tracker.update_count, 2);
        assert_eq!(tracker.last_changed, Some(2_000));
        assert_eq!(tracker.duration_ms(5_000), Some(3_000));

        assert_eq!(tracker.step(750.0, 500.0, 700.0, 4_000), Transition::Left);
        assert_eq!(tracker.update_count, 0);
        assert_eq!(tracker.last_left, Some(4_000));
        assert_eq!(tracker.since, None);
        assert_eq!(tracker.last_entered, Some(2_000));
    }
}
