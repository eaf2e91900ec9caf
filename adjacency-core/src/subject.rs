//! Tracked subjects
//!
//! Each engine owns exactly two [`TrackedSubject`]s. Only the movement filter
//! mutates them; everything else reads.

use alloc::string::String;
use core::fmt;

use crate::buffer::UpdateHistory;
use crate::constants::defaults::{GEOCODED_SUFFIX, MAX_UPDATE_HISTORY};
use crate::geo::Coordinate;
use crate::time::Timestamp;

/// Opaque host identifier of a subject (e.g. `device_tracker.alice_phone`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object part of the id with the geocoded suffix removed
    ///
    /// `sensor.alice_geocoded_location` → `alice`
    pub fn short_name(&self) -> &str {
        let object = self.0.split_once('.').map_or(self.0.as_str(), |(_, object)| object);
        object.strip_suffix(GEOCODED_SUFFIX).unwrap_or(object)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Movement state of one subject
#[derive(Debug, Clone)]
pub struct TrackedSubject {
    /// Host reference
    pub id: SubjectId,
    /// Last stored fix
    pub previous: Option<Coordinate>,
    /// Time of the last stored fix
    pub last_fix: Option<Timestamp>,
    /// Speed between the last two fixes, absent when not computable
    pub speed_kmh: Option<f64>,
    /// End of the resync hold window
    pub resync_until: Option<Timestamp>,
    /// Times at which combined updates were accepted
    pub history: UpdateHistory<MAX_UPDATE_HISTORY>,
}

impl TrackedSubject {
    pub fn new(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            previous: None,
            last_fix: None,
            speed_kmh: None,
            resync_until: None,
            history: UpdateHistory::new(),
        }
    }

    /// Still inside the resync hold window at `now`
    pub fn in_resync(&self, now: Timestamp) -> bool {
        self.resync_until.is_some_and(|until| now < until)
    }

    /// Store `coords` as the latest fix
    pub(crate) fn store_fix(&mut self, coords: Coordinate, now: Timestamp) {
        self.previous = Some(coords);
        self.last_fix = Some(now);
    }

    /// Record an accepted combined update and drop entries older than `keep_ms`
    pub fn record_update(&mut self, now: Timestamp, keep_ms: u64) {
        self.history.push(now);
        self.history.prune_before(now.saturating_sub(keep_ms));
    }

    /// Accepted updates in the `window_ms` ending at `now`
    pub fn updates_within(&self, window_ms: u64, now: Timestamp) -> u32 {
        self.history.count_since(now.saturating_sub(window_ms)) as u32
    }
}
