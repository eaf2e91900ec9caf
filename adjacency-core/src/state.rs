//! Computed State and Snapshots
//!
//! [`AdjacencyState`] is the engine's current result. It is only ever written
//! by the engine; everyone else gets an [`AdjacencySnapshot`], an owned copy
//! taken after a recompute together with the per-subject movement state and
//! the configuration in force.
//!
//! Invariants kept by the engine:
//! - `proximity_update_count > 0` implies `proximity`
//! - `last_entered` only moves on a false → true flip
//! - `proximity_since` is set exactly while `proximity` holds
//!
//! Snapshots also carry the display helpers hosts use for their sensors:
//! distances switch from meters to kilometers at 1 km unless meters are
//! forced, durations render as minutes with one decimal or as a short
//! `1d 2h 5m` text.

use alloc::format;
use alloc::string::String;

use crate::config::AdjacencyConfig;
use crate::constants::geo::METERS_PER_KM;
use crate::constants::time::{MINUTES_PER_DAY, MINUTES_PER_HOUR, MS_PER_SECOND, SECONDS_PER_MINUTE};
use crate::errors::{RejectReason, UnreliableReason};
use crate::events::one_decimal;
use crate::proximity::ProximityTracker;
use crate::subject::{SubjectId, TrackedSubject};
use crate::time::Timestamp;

/// Current computed result of one engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjacencyState {
    /// Last valid distance
    pub distance_m: Option<f64>,
    /// Bucket of the last valid distance
    pub bucket: Option<&'static str>,
    /// Initial bearing from A to B at the last valid cycle
    pub bearing_deg: Option<u16>,
    /// Whether the last recompute produced a trustworthy reading
    pub data_valid: bool,
    /// Why the last recompute was discarded
    pub last_error: Option<RejectReason>,
    /// Reliability verdict of the last valid cycle
    pub proximity_reliable: bool,
    pub unreliable_reason: Option<UnreliableReason>,
    pub updates_in_window_a: u32,
    pub updates_in_window_b: u32,
    pub convergence_speed_kmh: Option<f64>,
    /// Accuracy radii seen on the last recompute
    pub accuracy_a: Option<f64>,
    pub accuracy_b: Option<f64>,
    /// Hysteresis flag, update counter and transition stamps
    pub tracker: ProximityTracker,
    /// Last valid cycle
    pub last_valid_updated: Option<Timestamp>,
}

impl AdjacencyState {
    pub fn proximity(&self) -> bool {
        self.tracker.proximity
    }

    pub fn proximity_update_count(&self) -> u32 {
        self.tracker.update_count
    }

    /// Mark the cycle invalid, keeping every previously computed value
    pub(crate) fn invalidate(&mut self, reason: RejectReason) {
        self.data_valid = false;
        self.last_error = Some(reason);
    }
}

/// Read-only view of one tracked subject
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubjectSnapshot {
    pub id: SubjectId,
    pub speed_kmh: Option<f64>,
    pub last_fix: Option<Timestamp>,
    pub resync_until: Option<Timestamp>,
}

impl From<&TrackedSubject> for SubjectSnapshot {
    fn from(subject: &TrackedSubject) -> Self {
        Self {
            id: subject.id.clone(),
            speed_kmh: subject.speed_kmh,
            last_fix: subject.last_fix,
            resync_until: subject.resync_until,
        }
    }
}

/// Distance formatted for display
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DisplayDistance {
    pub value: f64,
    pub unit: &'static str,
    pub text: String,
}

impl DisplayDistance {
    /// Meters below 1 km (or always, when forced), kilometers above
    pub fn new(distance_m: f64, force_meters: bool) -> Self {
        let (value, unit) = if force_meters || distance_m < METERS_PER_KM {
            (one_decimal(distance_m), "m")
        } else {
            (one_decimal(distance_m / METERS_PER_KM), "km")
        };
        Self {
            value,
            unit,
            text: format!("{value} {unit}"),
        }
    }
}

/// Owned copy of an engine's state published after each recompute
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencySnapshot {
    pub state: AdjacencyState,
    pub a: SubjectSnapshot,
    pub b: SubjectSnapshot,
    pub config: AdjacencyConfig,
    pub taken_at: Timestamp,
}

impl AdjacencySnapshot {
    pub fn proximity(&self) -> bool {
        self.state.proximity()
    }

    pub fn display_distance(&self) -> Option<DisplayDistance> {
        self.state
            .distance_m
            .map(|d| DisplayDistance::new(d, self.config.force_meters()))
    }

    /// Distance in kilometers with one decimal
    pub fn distance_km(&self) -> Option<f64> {
        self.state.distance_m.map(|d| one_decimal(d / METERS_PER_KM))
    }

    /// Whole seconds spent in the current proximity period, zero outside it
    pub fn proximity_duration_secs(&self) -> u64 {
        if !self.state.proximity() {
            return 0;
        }
        self.state
            .tracker
            .duration_ms(self.taken_at)
            .map_or(0, |ms| ms / MS_PER_SECOND)
    }

    /// Proximity duration in minutes with one decimal
    pub fn proximity_duration_min(&self) -> f64 {
        one_decimal(self.proximity_duration_secs() as f64 / SECONDS_PER_MINUTE as f64)
    }

    pub fn proximity_duration_text(&self) -> String {
        format_duration(self.proximity_duration_secs())
    }
}

/// Short human duration, rounded to whole minutes: `1d 2h 5m`, `45m`, `0m`
pub fn format_duration(total_secs: u64) -> String {
    let minutes = (total_secs + SECONDS_PER_MINUTE / 2) / SECONDS_PER_MINUTE;
    if minutes == 0 {
        return String::from("0m");
    }

    let days = minutes / MINUTES_PER_DAY;
    let hours = (minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR;
    let mins = minutes % MINUTES_PER_HOUR;

    let mut text = String::new();
    for (value, unit) in [(days, "d"), (hours, "h"), (mins, "m")] {
        if value == 0 {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&format!("{value}{unit}"));
    }
    text
}

#[cfg(feature = "serde")]
mod serialize {
    //! Snapshots serialize with stable string codes for reasons

    use super::*;
    use alloc::string::ToString;
    use serde::ser::{Serialize, SerializeStruct, Serializer};

    impl Serialize for AdjacencySnapshot {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let state = &self.state;
            let tracker = &state.tracker;
            let mut s = serializer.serialize_struct("AdjacencySnapshot", 27)?;
            s.serialize_field("entity_a", &self.a.id)?;
            s.serialize_field("entity_b", &self.b.id)?;
            s.serialize_field("distance_m", &state.distance_m.map(one_decimal))?;
            s.serialize_field("distance_km", &self.distance_km())?;
            s.serialize_field("display", &self.display_distance())?;
            s.serialize_field("bucket", &state.bucket)?;
            s.serialize_field("bearing_deg", &state.bearing_deg)?;
            s.serialize_field("proximity", &tracker.proximity)?;
            s.serialize_field("proximity_update_count", &tracker.update_count)?;
            s.serialize_field("proximity_duration_min", &self.proximity_duration_min())?;
            s.serialize_field("proximity_duration_human", &self.proximity_duration_text())?;
            s.serialize_field("data_valid", &state.data_valid)?;
            s.serialize_field("last_error", &state.last_error.map(|e| e.code()))?;
            s.serialize_field("proximity_reliable", &state.proximity_reliable)?;
            s.serialize_field(
                "unreliable_reason",
                &state.unreliable_reason.map(|r| r.to_string()),
            )?;
            s.serialize_field("a_updates_in_window", &state.updates_in_window_a)?;
            s.serialize_field("b_updates_in_window", &state.updates_in_window_b)?;
            s.serialize_field(
                "convergence_speed_kmh",
                &state.convergence_speed_kmh.map(one_decimal),
            )?;
            s.serialize_field("accuracy_a", &state.accuracy_a.map(one_decimal))?;
            s.serialize_field("accuracy_b", &state.accuracy_b.map(one_decimal))?;
            s.serialize_field("a", &self.a)?;
            s.serialize_field("b", &self.b)?;
            s.serialize_field("last_changed", &tracker.last_changed)?;
            s.serialize_field("last_entered", &tracker.last_entered)?;
            s.serialize_field("last_left", &tracker.last_left)?;
            s.serialize_field("last_valid_updated", &state.last_valid_updated)?;
            s.serialize_field("config", &self.config)?;
            s.end()
        }
    }
}
