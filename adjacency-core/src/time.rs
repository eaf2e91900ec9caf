//! Time management for the engine
//!
//! Provides clock abstraction so the same engine runs against:
//! - System clock (hosted deployments)
//! - A manually driven clock (tests, replays, simulations)

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::constants::time::MS_PER_SECOND;

/// Timestamp in milliseconds since epoch (or since an arbitrary origin)
pub type Timestamp = u64;

/// Source of time for the engine
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs a manual origin)
    fn is_wall_clock(&self) -> bool;
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven time source
///
/// Clones share the same instant, so a test can hold one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Arc<AtomicU64>,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: Arc::new(AtomicU64::new(timestamp)),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(secs_to_ms(secs));
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Convert whole seconds to a millisecond span
pub const fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(MS_PER_SECOND)
}

/// Elapsed seconds between two timestamps, negative if `later` is earlier
pub fn elapsed_secs(earlier: Timestamp, later: Timestamp) -> f64 {
    (later as f64 - earlier as f64) / MS_PER_SECOND as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let time = FixedTime::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);
    }

    #[test]
    fn clones_share_the_clock() {
        let time = FixedTime::new(0);
        let engine_side = time.clone();

        time.advance_secs(3);
        assert_eq!(engine_side.now(), 3000);
    }

    #[test]
    fn elapsed_is_signed() {
        assert_eq!(elapsed_secs(1000, 3500), 2.5);
        assert_eq!(elapsed_secs(3000, 1000), -2.0);
    }

    #[test]
    fn seconds_to_ms_saturates() {
        assert_eq!(secs_to_ms(90), 90_000);
        assert_eq!(secs_to_ms(u64::MAX / 100), u64::MAX);
    }
}
