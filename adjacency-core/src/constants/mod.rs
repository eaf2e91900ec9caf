//! Constants for the Adjacency Core
//!
//! Centralized numeric values used throughout the engine. Every value carries
//! its unit in the name.
//!
//! ## Organization
//!
//! - **Geo**: Earth model and coordinate limits
//! - **Time**: Unit conversions
//! - **Defaults**: Configuration defaults, bucket table and event names
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Use descriptive names that include units

/// Earth model and coordinate limits.
pub mod geo;

/// Time-related constants and unit conversions.
pub mod time;

/// Configuration defaults, bucket table and notification names.
pub mod defaults;

// Re-export commonly used constants for convenience
pub use geo::{EARTH_MEAN_RADIUS_M, MPS_TO_KMH};

pub use time::{MS_PER_SECOND, SECONDS_PER_MINUTE};

pub use defaults::{
    DEFAULT_ENTRY_THRESHOLD_M, DEFAULT_EXIT_THRESHOLD_M, DEFAULT_DEBOUNCE_SECONDS,
    DEFAULT_MAX_ACCURACY_M, DEFAULT_MAX_SPEED_KMH,
};
