//! Great-Circle Geometry
//!
//! ## Overview
//!
//! The engine needs three numbers from a pair of coordinates:
//! - distance between them (meters)
//! - initial bearing from the first to the second (degrees)
//! - speed implied by moving between them over a time span (km/h)
//!
//! Distances use the haversine formula on a sphere of mean Earth radius.
//! Haversine stays numerically stable for the short distances proximity cares
//! about, where the spherical law of cosines loses precision.
//!
//! ```text
//! a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
//! d = 2R · atan2(√a, √(1−a))
//! ```
//!
//! All trigonometry goes through `libm` so the core stays `no_std`.

use libm::{atan2, cos, fabs, round, sin, sqrt};

use crate::constants::geo::{
    EARTH_MEAN_RADIUS_M, FULL_CIRCLE_DEG, MAX_LATITUDE_DEG, MAX_LONGITUDE_DEG, MPS_TO_KMH,
};

/// Point on the Earth surface in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    /// Latitude, positive north
    pub lat: f64,
    /// Longitude, positive east
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && fabs(self.lat) <= MAX_LATITUDE_DEG
            && fabs(self.lon) <= MAX_LONGITUDE_DEG
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_m(self, other)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance in meters
pub fn distance_m(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let sin_dphi = sin(d_phi / 2.0);
    let sin_dlambda = sin(d_lambda / 2.0);
    let a = sin_dphi * sin_dphi + cos(phi1) * cos(phi2) * sin_dlambda * sin_dlambda;
    // Rounding can push `a` a hair above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_MEAN_RADIUS_M * atan2(sqrt(a), sqrt(1.0 - a))
}

/// Initial bearing (forward azimuth) from `from` to `to`, whole degrees 0..360
pub fn bearing_deg(from: &Coordinate, to: &Coordinate) -> u16 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let y = sin(d_lambda) * cos(phi2);
    let x = cos(phi1) * sin(phi2) - sin(phi1) * cos(phi2) * cos(d_lambda);
    let bearing = atan2(y, x).to_degrees();

    let normalized = (bearing + FULL_CIRCLE_DEG) % FULL_CIRCLE_DEG;
    // 359.6 rounds up to a full circle
    (round(normalized) as u16) % FULL_CIRCLE_DEG as u16
}

/// Speed in km/h for `distance_m` covered in `dt_secs`
///
/// Returns `None` when the span is not positive.
pub fn speed_kmh(distance_m: f64, dt_secs: f64) -> Option<f64> {
    if dt_secs <= 0.0 {
        return None;
    }
    Some(distance_m / dt_secs * MPS_TO_KMH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_m(&Coordinate::new(0.0, 0.0), &Coordinate::new(1.0, 0.0));
        // π/180 · R
        assert!(close(d, 111_195.08, 0.5), "got {d}");
    }

    #[test]
    fn zero_distance_to_self() {
        let p = Coordinate::new(37.5665, 126.9780);
        assert_eq!(distance_m(&p, &p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let seoul = Coordinate::new(37.5665, 126.9780);
        let busan = Coordinate::new(35.1796, 129.0756);
        let there = distance_m(&seoul, &busan);
        let back = distance_m(&busan, &seoul);
        assert!(close(there, back, 1e-6));
        // Roughly 325 km apart
        assert!(there > 320_000.0 && there < 330_000.0, "got {there}");
    }

    #[test]
    fn cardinal_bearings() {
        let origin = Coordinate::new(0.0, 0.0);
        assert_eq!(bearing_deg(&origin, &Coordinate::new(1.0, 0.0)), 0);
        assert_eq!(bearing_deg(&origin, &Coordinate::new(0.0, 1.0)), 90);
        assert_eq!(bearing_deg(&origin, &Coordinate::new(-1.0, 0.0)), 180);
        assert_eq!(bearing_deg(&origin, &Coordinate::new(0.0, -1.0)), 270);
    }

    #[test]
    fn bearing_rounds_and_wraps() {
        let origin = Coordinate::new(0.0, 0.0);
        // atan2(0.001, 1) is about 0.057 deg either side of north
        assert_eq!(bearing_deg(&origin, &Coordinate::new(1.0, -0.001)), 0);
        assert_eq!(bearing_deg(&origin, &Coordinate::new(1.0, 0.001)), 0);
        // ~45.6 deg
        assert_eq!(bearing_deg(&origin, &Coordinate::new(1.0, 1.02)), 46);
    }

    #[test]
    fn speed_conversion() {
        // 100 km in one hour
        let speed = speed_kmh(100_000.0, 3600.0).unwrap();
        assert!(close(speed, 100.0, 1e-9));
        // 10 m/s
        assert_eq!(speed_kmh(10.0, 1.0), Some(36.0));
        assert_eq!(speed_kmh(10.0, 0.0), None);
        assert_eq!(speed_kmh(10.0, -1.0), None);
    }

    #[test]
    fn coordinate_validity() {
        assert!(Coordinate::new(89.9, -179.9).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
