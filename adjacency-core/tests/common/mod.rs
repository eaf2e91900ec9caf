//! Shared fixtures for engine integration tests
//!
//! - [`MockHost`]: in-memory host implementing every capability trait
//! - [`north_of`]: coordinate at an exact meridian distance from another
//! - [`Pair`]: engine + clock + host driven one cycle at a time

#![allow(dead_code)]

use std::collections::BTreeMap;

use adjacency_core::{
    AdjacencyConfig, AdjacencyEngine, AdjacencyEvent, AdjacencySnapshot, ConfigRecord,
    ConfigSource, Coordinate, CycleOutcome, FixedTime, LocationReading, NotificationSink,
    ReadingSource, SnapshotPublisher, SubjectId,
};

pub const BASE: &str = "person.alice";
pub const TRACKER: &str = "sensor.bob_geocoded_location";

/// Reference point for scenarios
pub const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.9780);

/// Meters per degree of latitude on the engine's sphere
pub const METERS_PER_DEG_LAT: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

/// Point `meters` due north of `from`
pub fn north_of(from: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(from.lat + meters / METERS_PER_DEG_LAT, from.lon)
}

pub fn reading(coord: Coordinate) -> LocationReading {
    LocationReading::at(coord.lat, coord.lon)
}

/// In-memory host
#[derive(Debug, Default)]
pub struct MockHost {
    pub readings: BTreeMap<SubjectId, LocationReading>,
    pub config: ConfigRecord,
    pub events: Vec<AdjacencyEvent>,
    pub snapshots: Vec<AdjacencySnapshot>,
}

impl MockHost {
    pub fn new(config: ConfigRecord) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set(&mut self, subject: &str, reading: LocationReading) {
        self.readings.insert(SubjectId::from(subject), reading);
    }

    pub fn clear(&mut self, subject: &str) {
        self.readings.remove(&SubjectId::from(subject));
    }

    /// Names of the events received so far, draining them
    pub fn take_names(&mut self) -> Vec<&'static str> {
        self.events.drain(..).map(|e| e.name()).collect()
    }
}

impl ReadingSource for MockHost {
    fn reading(&self, subject: &SubjectId) -> Option<LocationReading> {
        self.readings.get(subject).cloned()
    }
}

impl ConfigSource for MockHost {
    fn config_record(&self) -> ConfigRecord {
        self.config.clone()
    }
}

impl NotificationSink for MockHost {
    fn notify(&mut self, event: AdjacencyEvent) {
        self.events.push(event);
    }
}

impl SnapshotPublisher for MockHost {
    fn publish(&mut self, snapshot: &AdjacencySnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Engine driven through a mock host with a manual clock
pub struct Pair {
    pub engine: AdjacencyEngine<FixedTime>,
    pub clock: FixedTime,
    pub host: MockHost,
}

impl Pair {
    pub fn new(config: AdjacencyConfig) -> Self {
        let clock = FixedTime::new(1_700_000_000_000);
        let host = MockHost::new(config.to_record());
        let engine = AdjacencyEngine::new(BASE, TRACKER, config, clock.clone());
        Self { engine, clock, host }
    }

    /// Config that never gates on reliability
    pub fn ungated() -> Self {
        Self::new(
            AdjacencyConfig::builder()
                .min_updates(0, 300)
                .require_reliable_proximity(false)
                .build()
                .unwrap(),
        )
    }

    /// Advance `secs`, put A at the origin and B `distance_m` north, refresh
    pub fn step(&mut self, secs: u64, distance_m: f64) -> CycleOutcome {
        self.clock.advance_secs(secs);
        self.host.set(BASE, reading(ORIGIN));
        self.host.set(TRACKER, reading(north_of(ORIGIN, distance_m)));
        self.engine.refresh(&mut self.host)
    }

    /// Advance `secs` and refresh with whatever the host holds
    pub fn refresh_after(&mut self, secs: u64) -> CycleOutcome {
        self.clock.advance_secs(secs);
        self.engine.refresh(&mut self.host)
    }

    pub fn proximity(&self) -> bool {
        self.engine.state().proximity()
    }
}
