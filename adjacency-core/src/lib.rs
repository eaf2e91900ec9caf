//! Core proximity engine for Member Adjacency
//!
//! Tracks two location-reporting subjects and decides whether they are
//! "together", with hysteresis against GPS jitter and plausibility filters
//! against stale or teleporting fixes.
//!
//! Key constraints:
//! - Host-agnostic: readings, config and notifications go through traits
//! - `no_std` + `alloc` capable; `std` adds serde, logging and the system clock
//! - Nothing on the recompute path panics on bad input
//!
//! ```no_run
//! use adjacency_core::{AdjacencyConfig, AdjacencyEngine, LocationReading, SystemTime};
//!
//! let mut engine = AdjacencyEngine::new(
//!     "person.alice",
//!     "person.bob",
//!     AdjacencyConfig::default(),
//!     SystemTime,
//! );
//!
//! let mut events = Vec::new();
//! let a = LocationReading::at(37.5665, 126.9780);
//! let b = LocationReading::new().with_state("37.5668,126.9781");
//! engine.recompute(Some(&a), Some(&b), &mut events);
//!
//! for event in &events {
//!     println!("{}", event.name());
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod buffer;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod events;
pub mod extract;
pub mod geo;
pub mod movement;
pub mod proximity;
pub mod reading;
pub mod reliability;
pub mod state;
pub mod subject;
pub mod summary;
pub mod time;
pub mod traits;

// Public API
pub use config::{AdjacencyConfig, ConfigRecord};
pub use engine::{AdjacencyEngine, CycleOutcome};
pub use errors::{BucketError, ConfigError, ConfigResult, RejectReason, Side, UnreliableReason};
pub use events::{AdjacencyEvent, PayloadValue};
pub use geo::Coordinate;
pub use proximity::{BucketTable, Transition};
pub use reading::{AttributeValue, LocationReading};
pub use state::{AdjacencySnapshot, AdjacencyState};
pub use subject::SubjectId;
pub use summary::{AnchorSummary, AnyProximityTracker};
#[cfg(feature = "std")]
pub use time::SystemTime;
pub use time::{FixedTime, TimeSource, Timestamp};
pub use traits::{ConfigSource, Discard, NotificationSink, ReadingSource, SnapshotPublisher};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
