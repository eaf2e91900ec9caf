//! Coordinate and Accuracy Extraction
//!
//! ## Overview
//!
//! Subjects come from many integrations and each one stores its position
//! differently. The extractor tries a fixed list of strategies, first match
//! wins:
//!
//! 1. **Location list**: a `Location` attribute holding `[lat, lon]`
//!    (mobile app geocoded sensors)
//! 2. **Lat/lon fields**: separate `latitude` and `longitude` attributes
//!    (device trackers, zones, persons)
//! 3. **Textual pair**: a primary state of the form `"lat,lon"`
//!
//! A strategy *matches* when its field has the right shape. Once a strategy
//! matches, its verdict is final: a `Location` list with a non-numeric entry
//! yields no coordinate even if `latitude`/`longitude` are also present. That
//! keeps a broken primary source from being silently papered over by a stale
//! secondary one.
//!
//! Accuracy is read from `gps_accuracy`, `accuracy` or `horizontal_accuracy`,
//! first value that coerces to a float wins.
//!
//! Nothing here fails loudly: malformed data yields `None`.
//!
//! ```rust
//! use adjacency_core::extract::CoordinateExtractor;
//! use adjacency_core::reading::LocationReading;
//!
//! let extractor = CoordinateExtractor::default();
//! let reading = LocationReading::new().with_state("37.5665, 126.9780");
//! let coords = extractor.extract(&reading).unwrap();
//! assert_eq!(coords.lat, 37.5665);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::geo::Coordinate;
use crate::reading::{AttributeValue, LocationReading};

/// Attribute names probed for an accuracy radius, in order
pub const ACCURACY_FIELDS: [&str; 3] = ["gps_accuracy", "accuracy", "horizontal_accuracy"];

/// Verdict of a single strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extraction {
    /// The reading does not carry this strategy's field
    NotApplicable,
    /// Field present and parsed
    Found(Coordinate),
    /// Field present but unusable
    Malformed,
}

impl Extraction {
    fn from_pair(lat: Option<f64>, lon: Option<f64>) -> Self {
        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                let coord = Coordinate::new(lat, lon);
                if coord.is_valid() {
                    Extraction::Found(coord)
                } else {
                    Extraction::Malformed
                }
            }
            _ => Extraction::Malformed,
        }
    }
}

/// One way of finding a coordinate in a reading
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Inspect the reading
    fn extract(&self, reading: &LocationReading) -> Extraction;
}

/// `Location: [lat, lon]`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationListStrategy;

impl ExtractionStrategy for LocationListStrategy {
    fn name(&self) -> &'static str {
        "location_list"
    }

    fn extract(&self, reading: &LocationReading) -> Extraction {
        match reading.attribute("Location").and_then(AttributeValue::as_list) {
            Some([lat, lon]) => Extraction::from_pair(lat.as_f64(), lon.as_f64()),
            _ => Extraction::NotApplicable,
        }
    }
}

/// `latitude` + `longitude`
#[derive(Debug, Clone, Copy, Default)]
pub struct LatLonFieldsStrategy;

impl ExtractionStrategy for LatLonFieldsStrategy {
    fn name(&self) -> &'static str {
        "lat_lon_fields"
    }

    fn extract(&self, reading: &LocationReading) -> Extraction {
        match (reading.attributes.get("latitude"), reading.attributes.get("longitude")) {
            (Some(lat), Some(lon)) => Extraction::from_pair(lat.as_f64(), lon.as_f64()),
            _ => Extraction::NotApplicable,
        }
    }
}

/// State string `"lat,lon"`
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualPairStrategy;

impl ExtractionStrategy for TextualPairStrategy {
    fn name(&self) -> &'static str {
        "textual_pair"
    }

    fn extract(&self, reading: &LocationReading) -> Extraction {
        let state = match reading.state.as_deref() {
            Some(state) if state.contains(',') => state,
            _ => return Extraction::NotApplicable,
        };

        let mut parts = state.split(',').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lat), Some(lon), None) => {
                Extraction::from_pair(lat.parse().ok(), lon.parse().ok())
            }
            _ => Extraction::Malformed,
        }
    }
}

/// Ordered set of extraction strategies
pub struct CoordinateExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for CoordinateExtractor {
    fn default() -> Self {
        Self::new()
            .with_strategy(LocationListStrategy)
            .with_strategy(LatLonFieldsStrategy)
            .with_strategy(TextualPairStrategy)
    }
}

impl CoordinateExtractor {
    /// Extractor with no strategies
    pub fn new() -> Self {
        Self { strategies: Vec::new() }
    }

    /// Append a strategy with the lowest priority so far
    pub fn with_strategy<S: ExtractionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the strategies in priority order
    pub fn strategy_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|s| s.name())
    }

    /// Latitude/longitude of the reading, if any strategy finds a usable one
    pub fn extract(&self, reading: &LocationReading) -> Option<Coordinate> {
        for strategy in &self.strategies {
            match strategy.extract(reading) {
                Extraction::NotApplicable => continue,
                Extraction::Found(coord) => return Some(coord),
                Extraction::Malformed => {
                    log_debug!("{} strategy found malformed coordinates", strategy.name());
                    return None;
                }
            }
        }
        None
    }

    /// Reported accuracy radius in meters
    pub fn extract_accuracy(&self, reading: &LocationReading) -> Option<f64> {
        extract_accuracy(reading)
    }
}

/// Reported accuracy radius in meters, first coercible field wins
pub fn extract_accuracy(reading: &LocationReading) -> Option<f64> {
    ACCURACY_FIELDS
        .iter()
        .filter_map(|field| reading.attribute(field))
        .filter_map(AttributeValue::as_f64)
        .find(|v| v.is_finite())
}
