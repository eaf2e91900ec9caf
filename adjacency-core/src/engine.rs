//! Adjacency Engine
//!
//! ## Overview
//!
//! One engine watches one pair of subjects. Every recompute runs the same
//! pipeline; any stage can end the cycle as *invalid*:
//!
//! ```text
//! readings ──► extract ──► accuracy ──► movement ──► distance ──► reliability
//!                 │            │           │                          │
//!           missing_coords  accuracy_   resync_* /                    ▼
//!                           filtered_*  speed_filtered_*   bucket ─► hysteresis ─► notifications
//! ```
//!
//! An invalid cycle keeps the last distance, bucket and proximity flag and
//! only records why it was discarded. Movement state is still persisted for
//! both subjects so the next fix is measured against a fresh baseline.
//!
//! ## Ownership
//!
//! The engine owns both [`TrackedSubject`]s and the [`AdjacencyState`]. It
//! needs `&mut self` for every recompute, so concurrent recomputes of the same
//! pair are impossible by construction; hosted runtimes put the engine behind
//! a single task (see the connectors crate).
//!
//! ```rust
//! use adjacency_core::engine::AdjacencyEngine;
//! use adjacency_core::config::AdjacencyConfig;
//! use adjacency_core::reading::LocationReading;
//! use adjacency_core::time::FixedTime;
//!
//! let config = AdjacencyConfig::builder().min_updates(0, 300).build().unwrap();
//! let mut engine = AdjacencyEngine::new("person.alice", "person.bob", config, FixedTime::new(0));
//!
//! let mut events = Vec::new();
//! let a = LocationReading::at(37.5665, 126.9780);
//! let b = LocationReading::at(37.5670, 126.9780);
//! let outcome = engine.recompute(Some(&a), Some(&b), &mut events);
//!
//! assert!(outcome.is_valid());
//! assert!(engine.state().proximity());
//! assert_eq!(events[0].name(), "member_adjacency_enter");
//! ```

use alloc::format;
use alloc::string::String;

use crate::config::AdjacencyConfig;
use crate::errors::{ConfigResult, RejectReason, Side};
use crate::events::{
    one_decimal, reason_text, whole_meters, AdjacencyEvent, EnterPayload, LeavePayload,
    ProximityUpdatePayload,
};
use crate::extract::CoordinateExtractor;
use crate::geo::{self, Coordinate};
use crate::movement::MovementFilter;
use crate::proximity::{BucketTable, Transition};
use crate::reading::LocationReading;
use crate::reliability::{DistanceSample, Reliability, ReliabilityAssessor};
use crate::state::{AdjacencySnapshot, AdjacencyState, SubjectSnapshot};
use crate::subject::{SubjectId, TrackedSubject};
use crate::time::{secs_to_ms, TimeSource, Timestamp};
use crate::traits::{ConfigSource, NotificationSink, ReadingSource, SnapshotPublisher};

/// Result of one recompute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Distance and proximity were recomputed
    Valid {
        distance_m: f64,
        transition: Transition,
        reliable: bool,
    },
    /// Cycle discarded, previous values kept
    Invalid(RejectReason),
}

impl CycleOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn transition(&self) -> Option<Transition> {
        match self {
            Self::Valid { transition, .. } => Some(*transition),
            Self::Invalid(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

/// Proximity engine for one pair of subjects
pub struct AdjacencyEngine<T: TimeSource> {
    a: TrackedSubject,
    b: TrackedSubject,
    state: AdjacencyState,
    config: AdjacencyConfig,
    movement: MovementFilter,
    assessor: ReliabilityAssessor,
    extractor: CoordinateExtractor,
    buckets: BucketTable,
    previous_sample: Option<DistanceSample>,
    time: T,
}

impl<T: TimeSource> AdjacencyEngine<T> {
    /// Engine for base subject `a` and tracker `b`
    pub fn new(
        a: impl Into<SubjectId>,
        b: impl Into<SubjectId>,
        config: AdjacencyConfig,
        time: T,
    ) -> Self {
        Self {
            a: TrackedSubject::new(a),
            b: TrackedSubject::new(b),
            state: AdjacencyState::default(),
            movement: MovementFilter::from_config(&config),
            assessor: ReliabilityAssessor::from_config(&config),
            config,
            extractor: CoordinateExtractor::default(),
            buckets: BucketTable::default(),
            previous_sample: None,
            time,
        }
    }

    /// Replace the distance bucket table
    pub fn with_buckets(mut self, buckets: BucketTable) -> Self {
        self.buckets = buckets;
        self
    }

    /// Replace the coordinate extractor
    pub fn with_extractor(mut self, extractor: CoordinateExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AdjacencyConfig {
        &self.config
    }

    pub fn state(&self) -> &AdjacencyState {
        &self.state
    }

    pub fn subject(&self, side: Side) -> &TrackedSubject {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    /// `<a>_<b>` with domains and geocoded suffixes stripped
    pub fn pair_key(&self) -> String {
        format!("{}_{}", self.a.id.short_name(), self.b.id.short_name())
    }

    /// Swap in a validated configuration
    pub fn set_config(&mut self, config: AdjacencyConfig) {
        self.movement = MovementFilter::from_config(&config);
        self.assessor = ReliabilityAssessor::from_config(&config);
        self.config = config;
    }

    /// Re-read the configuration; an invalid record keeps the current one
    pub fn reload_config<C: ConfigSource + ?Sized>(&mut self, source: &C) -> ConfigResult<()> {
        match AdjacencyConfig::from_record(&source.config_record()) {
            Ok(config) => {
                if config != self.config {
                    self.set_config(config);
                }
                Ok(())
            }
            Err(err) => {
                log_warn!("{}: keeping previous configuration: {}", self.pair_key(), err);
                Err(err)
            }
        }
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> AdjacencySnapshot {
        AdjacencySnapshot {
            state: self.state.clone(),
            a: SubjectSnapshot::from(&self.a),
            b: SubjectSnapshot::from(&self.b),
            config: self.config.clone(),
            taken_at: self.time.now(),
        }
    }

    /// Reload config, read both subjects, recompute and publish
    ///
    /// The snapshot is published whether or not the cycle was valid.
    pub fn refresh<H>(&mut self, host: &mut H) -> CycleOutcome
    where
        H: ReadingSource + ConfigSource + NotificationSink + SnapshotPublisher,
    {
        // Rejections are logged inside; the previous config stays in force
        let _ = self.reload_config(&*host);

        let reading_a = host.reading(&self.a.id);
        let reading_b = host.reading(&self.b.id);
        let outcome = self.recompute(reading_a.as_ref(), reading_b.as_ref(), host);

        host.publish(&self.snapshot());
        outcome
    }

    /// Run one cycle on the given readings
    pub fn recompute<S: NotificationSink + ?Sized>(
        &mut self,
        reading_a: Option<&LocationReading>,
        reading_b: Option<&LocationReading>,
        sink: &mut S,
    ) -> CycleOutcome {
        let now = self.time.now();

        let coords_a = reading_a.and_then(|r| self.extractor.extract(r));
        let coords_b = reading_b.and_then(|r| self.extractor.extract(r));
        self.state.accuracy_a = reading_a.and_then(|r| self.extractor.extract_accuracy(r));
        self.state.accuracy_b = reading_b.and_then(|r| self.extractor.extract_accuracy(r));

        let (coords_a, coords_b) = match (coords_a, coords_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return self.reject(RejectReason::MissingCoords),
        };

        if let Some(reason) = self.check_accuracy() {
            return self.reject(reason);
        }

        // Both sides are processed so each keeps a fresh baseline
        let outcome_a = self.movement.process(&mut self.a, Some(coords_a), now);
        let outcome_b = self.movement.process(&mut self.b, Some(coords_b), now);
        let rejection = outcome_a
            .and_then(|o| o.rejection(Side::A))
            .or_else(|| outcome_b.and_then(|o| o.rejection(Side::B)));
        if let Some(reason) = rejection {
            return self.reject(reason);
        }

        self.accept(coords_a, coords_b, now, sink)
    }

    fn check_accuracy(&self) -> Option<RejectReason> {
        let max_m = self.config.accuracy_ceiling_m()?;
        [(Side::A, self.state.accuracy_a), (Side::B, self.state.accuracy_b)]
            .into_iter()
            .find_map(|(side, accuracy)| match accuracy {
                Some(accuracy_m) if accuracy_m > max_m => {
                    Some(RejectReason::AccuracyFiltered { side, accuracy_m, max_m })
                }
                _ => None,
            })
    }

    fn reject(&mut self, reason: RejectReason) -> CycleOutcome {
        log_debug!("{}: cycle discarded: {}", self.pair_key(), reason);
        self.state.invalidate(reason);
        CycleOutcome::Invalid(reason)
    }

    fn accept<S: NotificationSink + ?Sized>(
        &mut self,
        coords_a: Coordinate,
        coords_b: Coordinate,
        now: Timestamp,
        sink: &mut S,
    ) -> CycleOutcome {
        let keep_ms = secs_to_ms(self.config.update_window_s()).saturating_mul(2);
        self.a.record_update(now, keep_ms);
        self.b.record_update(now, keep_ms);

        let distance_m = geo::distance_m(&coords_a, &coords_b);
        let reliability = self
            .assessor
            .assess(&self.a, &self.b, distance_m, self.previous_sample, now);
        self.previous_sample = Some(DistanceSample::new(distance_m, now));

        let state = &mut self.state;
        state.proximity_reliable = reliability.reliable;
        state.unreliable_reason = reliability.reason;
        state.updates_in_window_a = reliability.updates_in_window_a;
        state.updates_in_window_b = reliability.updates_in_window_b;
        state.convergence_speed_kmh = reliability.convergence_speed_kmh;
        state.distance_m = Some(distance_m);
        state.bearing_deg = Some(geo::bearing_deg(&coords_a, &coords_b));
        state.bucket = Some(self.buckets.classify(distance_m));
        state.data_valid = true;
        state.last_error = None;
        state.last_valid_updated = Some(now);

        let transition = state.tracker.step(
            distance_m,
            self.config.entry_threshold_m(),
            self.config.exit_threshold_m(),
            now,
        );

        if transition.changed() {
            log_debug!("{}: {:?} at {:.0} m", self.pair_key(), transition, distance_m);
        }
        self.notify(transition, distance_m, &reliability, sink);

        CycleOutcome::Valid {
            distance_m,
            transition,
            reliable: reliability.reliable,
        }
    }

    fn notify<S: NotificationSink + ?Sized>(
        &self,
        transition: Transition,
        distance_m: f64,
        reliability: &Reliability,
        sink: &mut S,
    ) {
        let require_reliable = self.config.require_reliable_proximity();
        let permitted = reliability.permits_notification(require_reliable);

        match transition {
            Transition::Entered => {
                let payload = self.enter_payload(distance_m, reliability);
                if permitted {
                    sink.notify(AdjacencyEvent::Entered(payload));
                    sink.notify(self.update_event(distance_m, 1, true, reliability));
                } else {
                    sink.notify(AdjacencyEvent::EnteredUnreliable(payload));
                }
            }
            Transition::Left => sink.notify(AdjacencyEvent::Left(LeavePayload {
                entity_a: self.a.id.clone(),
                entity_b: self.b.id.clone(),
                distance_m: whole_meters(distance_m),
                entry_threshold_m: self.config.entry_threshold_m(),
                exit_threshold_m: self.config.exit_threshold_m(),
            })),
            Transition::Stayed if permitted => {
                let count = self.state.proximity_update_count();
                sink.notify(self.update_event(distance_m, count, false, reliability));
            }
            Transition::Stayed | Transition::Idle => {}
        }
    }

    fn enter_payload(&self, distance_m: f64, reliability: &Reliability) -> EnterPayload {
        EnterPayload {
            entity_a: self.a.id.clone(),
            entity_b: self.b.id.clone(),
            distance_m: whole_meters(distance_m),
            entry_threshold_m: self.config.entry_threshold_m(),
            exit_threshold_m: self.config.exit_threshold_m(),
            proximity_update_count: 1,
            proximity_reliable: reliability.reliable,
            unreliable_reason: reason_text(reliability.reason),
            a_updates_in_window: reliability.updates_in_window_a,
            b_updates_in_window: reliability.updates_in_window_b,
            // Enter notifications report a standstill as null; snapshots keep 0.0
            convergence_speed_kmh: reliability
                .convergence_speed_kmh
                .filter(|kmh| *kmh != 0.0)
                .map(one_decimal),
        }
    }

    fn update_event(
        &self,
        distance_m: f64,
        count: u32,
        is_first_update: bool,
        reliability: &Reliability,
    ) -> AdjacencyEvent {
        AdjacencyEvent::ProximityUpdate(ProximityUpdatePayload {
            entity_a: self.a.id.clone(),
            entity_b: self.b.id.clone(),
            distance_m: whole_meters(distance_m),
            proximity_update_count: count,
            is_first_update,
            proximity_reliable: reliability.reliable,
            unreliable_reason: reason_text(reliability.reason),
        })
    }
}
