//! Proximity Reliability
//!
//! ## Overview
//!
//! Hysteresis decides *whether* the subjects are close. Reliability decides
//! whether that answer deserves a notification. A stale phone that wakes up
//! next to its partner should not announce "arrived together" on its first
//! fix.
//!
//! ## Checks
//!
//! Evaluated on every valid cycle, first failure wins:
//!
//! 1. Side A has at least `min_updates_for_proximity` accepted updates inside
//!    `update_window_s`
//! 2. Same for side B
//! 3. Convergence speed does not exceed twice the per-subject speed limit
//!    (both subjects moving straight at each other at full speed)
//! 4. Neither subject is inside its resync hold window
//!
//! Convergence speed compares the current distance with the one stored at the
//! previous valid cycle:
//!
//! ```text
//! v = (d_prev - d_now) / Δt · 3.6      positive = closing in
//! ```
//!
//! The verdict never changes the proximity flag. It only gates which
//! notification goes out.

use crate::config::AdjacencyConfig;
use crate::constants::MPS_TO_KMH;
use crate::errors::{Side, UnreliableReason};
use crate::subject::TrackedSubject;
use crate::time::{elapsed_secs, secs_to_ms, Timestamp};

/// Distance recorded at a valid cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceSample {
    pub distance_m: f64,
    pub at: Timestamp,
}

impl DistanceSample {
    pub fn new(distance_m: f64, at: Timestamp) -> Self {
        Self { distance_m, at }
    }

    /// Closing speed from this sample to `distance_m` at `now`
    ///
    /// `None` when no time has passed.
    pub fn convergence_kmh(&self, distance_m: f64, now: Timestamp) -> Option<f64> {
        let dt = elapsed_secs(self.at, now);
        if dt <= 0.0 {
            return None;
        }
        Some((self.distance_m - distance_m) / dt * MPS_TO_KMH)
    }
}

/// Verdict of one assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reliability {
    pub reliable: bool,
    pub reason: Option<UnreliableReason>,
    pub updates_in_window_a: u32,
    pub updates_in_window_b: u32,
    pub convergence_speed_kmh: Option<f64>,
}

impl Reliability {
    /// Whether an enter notification may go out under `require_reliable`
    pub fn permits_notification(&self, require_reliable: bool) -> bool {
        self.reliable || !require_reliable
    }
}

/// Reliability checks with their limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilityAssessor {
    min_updates: u32,
    window_ms: u64,
    max_speed_kmh: f64,
}

impl ReliabilityAssessor {
    pub fn new(min_updates: u32, window_s: u64, max_speed_kmh: f64) -> Self {
        Self {
            min_updates,
            window_ms: secs_to_ms(window_s),
            max_speed_kmh,
        }
    }

    pub fn from_config(config: &AdjacencyConfig) -> Self {
        Self::new(
            config.min_updates_for_proximity(),
            config.update_window_s(),
            config.max_speed_kmh(),
        )
    }

    /// Assess the current distance between `a` and `b`
    ///
    /// Update counts include any acceptance already recorded for this cycle.
    pub fn assess(
        &self,
        a: &TrackedSubject,
        b: &TrackedSubject,
        distance_m: f64,
        previous: Option<DistanceSample>,
        now: Timestamp,
    ) -> Reliability {
        let updates_in_window_a = a.updates_within(self.window_ms, now);
        let updates_in_window_b = b.updates_within(self.window_ms, now);
        let convergence_speed_kmh =
            previous.and_then(|sample| sample.convergence_kmh(distance_m, now));

        let reason = self
            .check_updates(Side::A, updates_in_window_a)
            .or_else(|| self.check_updates(Side::B, updates_in_window_b))
            .or_else(|| self.check_convergence(convergence_speed_kmh))
            .or_else(|| check_resync(Side::A, a, now))
            .or_else(|| check_resync(Side::B, b, now));

        Reliability {
            reliable: reason.is_none(),
            reason,
            updates_in_window_a,
            updates_in_window_b,
            convergence_speed_kmh,
        }
    }

    fn check_updates(&self, side: Side, count: u32) -> Option<UnreliableReason> {
        (count < self.min_updates).then_some(UnreliableReason::InsufficientUpdates {
            side,
            count,
            required: self.min_updates,
        })
    }

    fn check_convergence(&self, speed_kmh: Option<f64>) -> Option<UnreliableReason> {
        // A zero speed limit disables speed checks altogether
        if self.max_speed_kmh <= 0.0 {
            return None;
        }
        let limit_kmh = self.max_speed_kmh * 2.0;
        match speed_kmh {
            Some(speed_kmh) if speed_kmh > limit_kmh => {
                Some(UnreliableReason::UnrealisticConvergence { speed_kmh, limit_kmh })
            }
            _ => None,
        }
    }
}

fn check_resync(side: Side, subject: &TrackedSubject, now: Timestamp) -> Option<UnreliableReason> {
    subject
        .in_resync(now)
        .then_some(UnreliableReason::Resync { side })
}
