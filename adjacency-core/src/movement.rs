//! Movement Filter
//!
//! ## Overview
//!
//! Phones report positions late, out of order, and sometimes from a cell
//! tower three kilometers away. Feeding those straight into the hysteresis
//! produces proximity notifications for people who never moved. The movement
//! filter keeps per-subject state and classifies every new fix before the
//! distance between subjects is trusted.
//!
//! ## Classification
//!
//! ```text
//! new fix ──► silent > resync_silence_s? ──yes──► ResyncTriggered (hold starts)
//!                     │ no
//!                     ▼
//!             inside hold window? ─────yes──► ResyncHeld
//!                     │ no
//!                     ▼
//!             no previous fix / dt <= 0 ─yes─► FirstFix
//!                     │ no
//!                     ▼
//!             speed > max_speed_kmh? ──yes──► SpeedRejected
//!                     │ no
//!                     ▼
//!                  Accepted
//! ```
//!
//! Every outcome stores the new fix as the previous one. Rejected fixes still
//! become the speed baseline, otherwise one bad fix would make every later
//! fix look like a teleport.
//!
//! After a silence the speed baseline is stale, so the hold window gives the
//! subject time to deliver a couple of fresh fixes. The first fix after the
//! hold is measured against the last held fix, which is recent, so there is no
//! artificial speed spike.

use crate::config::AdjacencyConfig;
use crate::errors::{RejectReason, Side};
use crate::geo::{self, Coordinate};
use crate::subject::TrackedSubject;
use crate::time::{elapsed_secs, secs_to_ms, Timestamp};

/// What the filter decided about one fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementOutcome {
    /// Plausible movement from the previous fix
    Accepted {
        /// Speed since the previous fix
        speed_kmh: f64,
    },
    /// No usable baseline yet; stored without a speed
    FirstFix,
    /// Fix after a long silence; starts the hold window
    ResyncTriggered,
    /// Fix inside the hold window; stored, but the cycle is discarded
    ResyncHeld,
    /// Implausible speed; stored as baseline, cycle discarded
    SpeedRejected {
        /// Computed speed
        speed_kmh: f64,
        /// Configured ceiling
        max_kmh: f64,
    },
}

impl MovementOutcome {
    /// Whether the combined cycle may continue
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::FirstFix)
    }

    /// Rejection this outcome causes for `side`, if any
    pub fn rejection(&self, side: Side) -> Option<RejectReason> {
        match *self {
            Self::Accepted { .. } | Self::FirstFix => None,
            Self::ResyncTriggered | Self::ResyncHeld => Some(RejectReason::Resync { side }),
            Self::SpeedRejected { speed_kmh, max_kmh } => Some(RejectReason::SpeedFiltered {
                side,
                speed_kmh,
                max_kmh,
            }),
        }
    }
}

/// Per-subject movement classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementFilter {
    resync_silence_s: u64,
    resync_hold_s: u64,
    max_speed_kmh: f64,
}

impl MovementFilter {
    pub fn new(resync_silence_s: u64, resync_hold_s: u64, max_speed_kmh: f64) -> Self {
        Self {
            resync_silence_s,
            resync_hold_s,
            max_speed_kmh,
        }
    }

    pub fn from_config(config: &AdjacencyConfig) -> Self {
        Self::new(
            config.resync_silence_s(),
            config.resync_hold_s(),
            config.max_speed_kmh(),
        )
    }

    /// Classify `coords` for `subject` at `now` and update its state
    ///
    /// Returns `None` when there is no fix to classify.
    pub fn process(
        &self,
        subject: &mut TrackedSubject,
        coords: Option<Coordinate>,
        now: Timestamp,
    ) -> Option<MovementOutcome> {
        let coords = coords?;

        if let Some(last_fix) = subject.last_fix {
            if elapsed_secs(last_fix, now) > self.resync_silence_s as f64 {
                subject.resync_until = Some(now.saturating_add(secs_to_ms(self.resync_hold_s)));
                subject.speed_kmh = None;
                subject.store_fix(coords, now);
                return Some(MovementOutcome::ResyncTriggered);
            }
        }

        if subject.in_resync(now) {
            subject.speed_kmh = None;
            subject.store_fix(coords, now);
            return Some(MovementOutcome::ResyncHeld);
        }

        let (previous, last_fix) = match (subject.previous, subject.last_fix) {
            (Some(previous), Some(last_fix)) => (previous, last_fix),
            _ => {
                subject.speed_kmh = None;
                subject.store_fix(coords, now);
                return Some(MovementOutcome::FirstFix);
            }
        };

        let dt_secs = elapsed_secs(last_fix, now);
        let speed_kmh = match geo::speed_kmh(geo::distance_m(&previous, &coords), dt_secs) {
            Some(speed) => speed,
            None => {
                subject.speed_kmh = None;
                subject.store_fix(coords, now);
                return Some(MovementOutcome::FirstFix);
            }
        };

        subject.speed_kmh = Some(speed_kmh);
        subject.store_fix(coords, now);

        if self.max_speed_kmh > 0.0 && speed_kmh > self.max_speed_kmh {
            return Some(MovementOutcome::SpeedRejected {
                speed_kmh,
                max_kmh: self.max_speed_kmh,
            });
        }

        Some(MovementOutcome::Accepted { speed_kmh })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(37.0, 127.0);
    // 0.9° of latitude north of ORIGIN, about 100.08 km
    const FAR: Coordinate = Coordinate::new(37.9, 127.0);

    fn filter() -> MovementFilter {
        MovementFilter::new(600, 60, 150.0)
    }

    fn subject_with_fix(coords: Coordinate, at: Timestamp) -> TrackedSubject {
        let mut subject = TrackedSubject::new("person.alice");
        subject.store_fix(coords, at);
        subject
    }

    #[test]
    fn absent_coords_are_a_no_op() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        assert_eq!(filter().process(&mut subject, None, 5_000), None);
        assert_eq!(subject.last_fix, Some(0));
    }

    #[test]
    fn first_fix_has_no_speed() {
        let mut subject = TrackedSubject::new("person.alice");
        let outcome = filter().process(&mut subject, Some(ORIGIN), 1_000);
        assert_eq!(outcome, Some(MovementOutcome::FirstFix));
        assert_eq!(subject.previous, Some(ORIGIN));
        assert_eq!(subject.last_fix, Some(1_000));
        assert_eq!(subject.speed_kmh, None);
    }

    #[test]
    fn teleport_is_rejected_but_becomes_baseline() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        let outcome = filter().process(&mut subject, Some(FAR), 60_000).unwrap();

        match outcome {
            MovementOutcome::SpeedRejected { speed_kmh, max_kmh } => {
                assert!(speed_kmh > 5_900.0 && speed_kmh < 6_100.0, "got {speed_kmh}");
                assert_eq!(max_kmh, 150.0);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(outcome.rejection(Side::B).map(|r| r.code()), Some("speed_filtered_b"));
        assert_eq!(subject.previous, Some(FAR));
        assert_eq!(subject.last_fix, Some(60_000));
    }

    #[test]
    fn same_displacement_over_an_hour_is_accepted() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        let outcome = filter().process(&mut subject, Some(FAR), 3_600_000).unwrap();

        match outcome {
            MovementOutcome::Accepted { speed_kmh } => {
                assert!(speed_kmh > 99.0 && speed_kmh < 101.0, "got {speed_kmh}");
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert!(subject.speed_kmh.is_some());
    }

    #[test]
    fn zero_speed_limit_disables_filter() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        let outcome = MovementFilter::new(600, 60, 0.0)
            .process(&mut subject, Some(FAR), 60_000)
            .unwrap();
        assert!(outcome.is_accepted());
    }

    #[test]
    fn non_positive_dt_stores_without_speed() {
        let mut subject = subject_with_fix(ORIGIN, 10_000);
        subject.speed_kmh = Some(42.0);
        let outcome = filter().process(&mut subject, Some(FAR), 10_000);
        assert_eq!(outcome, Some(MovementOutcome::FirstFix));
        assert_eq!(subject.speed_kmh, None);
        assert_eq!(subject.previous, Some(FAR));
    }

    #[test]
    fn silence_triggers_resync_then_hold() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        subject.speed_kmh = Some(30.0);

        // 601s of silence
        let outcome = filter().process(&mut subject, Some(ORIGIN), 601_000);
        assert_eq!(outcome, Some(MovementOutcome::ResyncTriggered));
        assert_eq!(subject.resync_until, Some(661_000));
        assert_eq!(subject.speed_kmh, None);

        // Inside the hold window
        let outcome = filter().process(&mut subject, Some(ORIGIN), 630_000);
        assert_eq!(outcome, Some(MovementOutcome::ResyncHeld));
        assert_eq!(outcome.unwrap().rejection(Side::A).map(|r| r.code()), Some("resync_a"));
        assert_eq!(subject.last_fix, Some(630_000));

        // Hold over: measured against the held fix, no spike
        let outcome = filter().process(&mut subject, Some(ORIGIN), 661_000);
        assert_eq!(outcome, Some(MovementOutcome::Accepted { speed_kmh: 0.0 }));
    }

    #[test]
    fn silence_exactly_at_limit_is_not_a_resync() {
        let mut subject = subject_with_fix(ORIGIN, 0);
        let outcome = filter().process(&mut subject, Some(ORIGIN), 600_000);
        assert_eq!(outcome, Some(MovementOutcome::Accepted { speed_kmh: 0.0 }));
    }
}
