//! Earth Model Constants
//!
//! Distances are great-circle distances on a sphere. The sphere radius is the
//! IUGG mean Earth radius, which keeps the error against the WGS84 ellipsoid
//! under 0.5% for any pair of points.

/// Mean Earth radius (meters).
///
/// Source: IUGG mean radius R1 = (2a + b) / 3 of the WGS84 ellipsoid
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Conversion factor from meters per second to kilometers per hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// Largest valid latitude magnitude (degrees).
pub const MAX_LATITUDE_DEG: f64 = 90.0;

/// Largest valid longitude magnitude (degrees).
pub const MAX_LONGITUDE_DEG: f64 = 180.0;

/// Full circle (degrees), used to normalize bearings.
pub const FULL_CIRCLE_DEG: f64 = 360.0;

/// Meters per kilometer.
pub const METERS_PER_KM: f64 = 1000.0;
