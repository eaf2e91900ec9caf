//! Anchor summaries
//!
//! One anchor (usually home or a parent) is paired with several targets, one
//! engine per pair. The summary folds the pair snapshots into "who is nearest"
//! and "is anyone close", and [`AnyProximityTracker`] turns edges of the
//! latter into `any_enter` / `any_leave` notifications.

use alloc::vec::Vec;

use crate::events::{whole_meters, AdjacencyEvent, AnyProximityPayload};
use crate::state::AdjacencySnapshot;
use crate::subject::SubjectId;

/// Aggregate over every pair sharing an anchor
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnchorSummary {
    pub anchor: SubjectId,
    pub targets: Vec<SubjectId>,
    /// Closest target with a valid distance
    pub nearest_target: Option<SubjectId>,
    pub nearest_distance_m: Option<f64>,
    /// At least one pair is in proximity
    pub any_proximity: bool,
}

impl AnchorSummary {
    /// Fold `(target, snapshot)` pairs
    ///
    /// Only pairs whose last cycle was valid compete for nearest; proximity
    /// counts for every pair since it is held across invalid cycles.
    pub fn from_pairs(anchor: SubjectId, pairs: &[(SubjectId, &AdjacencySnapshot)]) -> Self {
        let mut nearest: Option<(&SubjectId, f64)> = None;
        let mut any_proximity = false;

        for (target, snapshot) in pairs {
            any_proximity |= snapshot.proximity();

            let distance = match snapshot.state.distance_m {
                Some(d) if snapshot.state.data_valid => d,
                _ => continue,
            };
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((target, distance));
            }
        }

        Self {
            anchor,
            targets: pairs.iter().map(|(target, _)| target.clone()).collect(),
            nearest_target: nearest.map(|(target, _)| target.clone()),
            nearest_distance_m: nearest.map(|(_, d)| d),
            any_proximity,
        }
    }
}

/// Edge detector for `any_proximity`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyProximityTracker {
    previous: bool,
}

impl AnyProximityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_proximity(&self) -> bool {
        self.previous
    }

    /// Notification for a change of `any_proximity`, if there was one
    pub fn update(
        &mut self,
        summary: &AnchorSummary,
        entry_threshold_m: f64,
        exit_threshold_m: f64,
    ) -> Option<AdjacencyEvent> {
        if summary.any_proximity == self.previous {
            return None;
        }
        self.previous = summary.any_proximity;

        let payload = AnyProximityPayload {
            anchor: summary.anchor.clone(),
            any_proximity: summary.any_proximity,
            entry_threshold_m,
            exit_threshold_m,
            nearest_target: summary.nearest_target.clone(),
            nearest_distance_m: summary.nearest_distance_m.map(whole_meters),
        };

        Some(if summary.any_proximity {
            AdjacencyEvent::AnyEntered(payload)
        } else {
            AdjacencyEvent::AnyLeft(payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdjacencyConfig;
    use crate::state::{AdjacencyState, SubjectSnapshot};
    use crate::subject::TrackedSubject;
    use alloc::vec;

    fn snapshot(distance_m: Option<f64>, valid: bool, proximity: bool) -> AdjacencySnapshot {
        let mut state = AdjacencyState {
            distance_m,
            data_valid: valid,
            ..AdjacencyState::default()
        };
        state.tracker.proximity = proximity;
        AdjacencySnapshot {
            state,
            a: SubjectSnapshot::from(&TrackedSubject::new("zone.home")),
            b: SubjectSnapshot::from(&TrackedSubject::new("person.x")),
            config: AdjacencyConfig::default(),
            taken_at: 0,
        }
    }

    #[test]
    fn nearest_ignores_invalid_pairs() {
        let alice = snapshot(Some(900.0), true, false);
        let bob = snapshot(Some(100.0), false, true);
        let carol = snapshot(Some(300.0), true, true);
        let pairs = vec![
            (SubjectId::from("person.alice"), &alice),
            (SubjectId::from("person.bob"), &bob),
            (SubjectId::from("person.carol"), &carol),
        ];

        let summary = AnchorSummary::from_pairs(SubjectId::from("zone.home"), &pairs);
        assert_eq!(summary.nearest_target, Some(SubjectId::from("person.carol")));
        assert_eq!(summary.nearest_distance_m, Some(300.0));
        assert!(summary.any_proximity);
        assert_eq!(summary.targets.len(), 3);
    }

    #[test]
    fn any_proximity_edges() {
        let near = snapshot(Some(120.4), true, true);
        let far = snapshot(Some(2_000.0), true, false);
        let anchor = SubjectId::from("zone.home");
        let mut tracker = AnyProximityTracker::new();

        let summary = AnchorSummary::from_pairs(anchor.clone(), &[(SubjectId::from("person.a"), &near)]);
        let event = tracker.update(&summary, 500.0, 700.0).unwrap();
        assert_eq!(event.name(), "member_adjacency_any_enter");
        match event {
            AdjacencyEvent::AnyEntered(p) => assert_eq!(p.nearest_distance_m, Some(120)),
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(tracker.update(&summary, 500.0, 700.0), None);

        let summary = AnchorSummary::from_pairs(anchor, &[(SubjectId::from("person.a"), &far)]);
        let event = tracker.update(&summary, 500.0, 700.0).unwrap();
        assert_eq!(event.name(), "member_adjacency_any_leave");
        assert!(!tracker.any_proximity());
    }
}
