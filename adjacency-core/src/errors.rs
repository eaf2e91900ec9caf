//! Error Types for Adjacency Computation
//!
//! ## Design Philosophy
//!
//! Nothing the engine sees at runtime is fatal. A reading that cannot be used
//! degrades to an *invalid cycle*: the last good distance, bucket and proximity
//! state are kept and the reason is surfaced through `last_error`. The types in
//! this module exist so that those reasons are typed values inside the crate
//! and stable strings at the edge.
//!
//! Like the rest of the core they are small and `Copy`:
//! - no heap data, only numbers and [`Side`] tags
//! - `code()` returns the `&'static str` the host stores and matches on
//! - `Display` adds the numbers that explain the failure
//!
//! ## Error Categories
//!
//! ### Cycle rejections ([`RejectReason`])
//! - `missing_coords`: one or both subjects have no usable coordinate
//! - `accuracy_filtered_a` / `_b`: reported accuracy radius above the ceiling
//! - `resync_a` / `_b`: silence-triggered or held resync
//! - `speed_filtered_a` / `_b`: implausible speed between fixes
//!
//! ### Reliability verdicts ([`UnreliableReason`])
//! These never invalidate a cycle; they only gate which notification fires.
//!
//! ### Construction errors ([`ConfigError`], [`BucketError`])
//! Raised before any computation happens.
//!
//! ```rust
//! use adjacency_core::{RejectReason, Side};
//!
//! let reason = RejectReason::SpeedFiltered { side: Side::B, speed_kmh: 6000.0, max_kmh: 150.0 };
//! assert_eq!(reason.code(), "speed_filtered_b");
//! ```

use core::fmt;
use thiserror_no_std::Error;

/// Result type for configuration construction and reload
pub type ConfigResult<T> = Result<T, ConfigError>;

/// One of the two tracked subjects
///
/// `A` is the base (anchor) subject, `B` the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    /// Base subject
    A,
    /// Tracker subject
    B,
}

impl Side {
    /// Lowercase suffix used in error and attribute codes
    pub const fn suffix(&self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Why a recompute cycle was discarded
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// One or both subjects have no coordinates this cycle
    #[error("missing_coords")]
    MissingCoords,

    /// Reported accuracy radius exceeds the configured ceiling
    #[error("accuracy_filtered_{side} ({accuracy_m} > {max_m} m)")]
    AccuracyFiltered {
        /// Offending subject
        side: Side,
        /// Reported accuracy radius
        accuracy_m: f64,
        /// Configured ceiling
        max_m: f64,
    },

    /// Reading arrived after a long silence or inside the resync hold window
    #[error("resync_{side}")]
    Resync {
        /// Offending subject
        side: Side,
    },

    /// Speed between consecutive fixes is not physically plausible
    #[error("speed_filtered_{side} ({speed_kmh} > {max_kmh} km/h)")]
    SpeedFiltered {
        /// Offending subject
        side: Side,
        /// Computed speed
        speed_kmh: f64,
        /// Configured ceiling
        max_kmh: f64,
    },
}

impl RejectReason {
    /// Stable code stored in `last_error`
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingCoords => "missing_coords",
            Self::AccuracyFiltered { side: Side::A, .. } => "accuracy_filtered_a",
            Self::AccuracyFiltered { side: Side::B, .. } => "accuracy_filtered_b",
            Self::Resync { side: Side::A } => "resync_a",
            Self::Resync { side: Side::B } => "resync_b",
            Self::SpeedFiltered { side: Side::A, .. } => "speed_filtered_a",
            Self::SpeedFiltered { side: Side::B, .. } => "speed_filtered_b",
        }
    }

    /// Subject responsible for the rejection, if a single one is
    pub const fn side(&self) -> Option<Side> {
        match self {
            Self::MissingCoords => None,
            Self::AccuracyFiltered { side, .. }
            | Self::Resync { side }
            | Self::SpeedFiltered { side, .. } => Some(*side),
        }
    }
}

/// Why a proximity reading is not trusted
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum UnreliableReason {
    /// Too few accepted updates for a subject inside the counting window
    #[error("insufficient_updates_{side} ({count}<{required})")]
    InsufficientUpdates {
        /// Subject lacking updates
        side: Side,
        /// Updates counted in the window
        count: u32,
        /// Minimum required
        required: u32,
    },

    /// The two subjects close in faster than two plausible movers could
    #[error("unrealistic_convergence ({speed_kmh:.1} > {limit_kmh} km/h)")]
    UnrealisticConvergence {
        /// Computed convergence speed
        speed_kmh: f64,
        /// Twice the configured maximum speed
        limit_kmh: f64,
    },

    /// A subject is still inside its resync hold window
    #[error("resync_{side}")]
    Resync {
        /// Subject in resync
        side: Side,
    },
}

impl UnreliableReason {
    /// Stable reason code without the numeric detail
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientUpdates { side: Side::A, .. } => "insufficient_updates_a",
            Self::InsufficientUpdates { side: Side::B, .. } => "insufficient_updates_b",
            Self::UnrealisticConvergence { .. } => "unrealistic_convergence",
            Self::Resync { side: Side::A } => "resync_a",
            Self::Resync { side: Side::B } => "resync_b",
        }
    }
}

/// Configuration rejected before any computation
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Exit threshold below entry threshold would make hysteresis flap
    #[error("exit threshold {exit_m} m is below entry threshold {entry_m} m")]
    ThresholdOrder {
        /// Configured entry threshold
        entry_m: f64,
        /// Configured exit threshold
        exit_m: f64,
    },

    /// Field is negative, NaN or otherwise unusable
    #[error("invalid value for {field}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
    },
}

/// Bucket table construction failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketError {
    /// No buckets given
    #[error("bucket table is empty")]
    Empty,

    /// More buckets than the table can hold
    #[error("bucket table holds at most {max} entries")]
    TooMany {
        /// Table capacity
        max: usize,
    },

    /// Bounds are not strictly ascending
    #[error("bucket bounds must be strictly ascending")]
    NotAscending,

    /// Last bound is finite, so some distances would have no bucket
    #[error("last bucket must be a catch-all")]
    NoCatchAll,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn reject_codes() {
        assert_eq!(RejectReason::MissingCoords.code(), "missing_coords");
        assert_eq!(RejectReason::Resync { side: Side::A }.code(), "resync_a");
        assert_eq!(
            RejectReason::AccuracyFiltered { side: Side::B, accuracy_m: 500.0, max_m: 200.0 }.code(),
            "accuracy_filtered_b"
        );
        assert_eq!(RejectReason::MissingCoords.side(), None);
    }

    #[test]
    fn unreliable_display_carries_counts() {
        let reason = UnreliableReason::InsufficientUpdates { side: Side::A, count: 2, required: 3 };
        assert_eq!(reason.to_string(), "insufficient_updates_a (2<3)");
        assert_eq!(reason.code(), "insufficient_updates_a");

        let reason = UnreliableReason::UnrealisticConvergence { speed_kmh: 450.04, limit_kmh: 300.0 };
        assert_eq!(reason.to_string(), "unrealistic_convergence (450.0 > 300 km/h)");
    }
}
