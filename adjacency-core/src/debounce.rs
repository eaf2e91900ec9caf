//! Trigger debouncing
//!
//! Subject changes arrive in bursts (a phone pushes position, battery and
//! Wi-Fi state within a second). Each change re-arms a single deadline;
//! the recompute runs once the burst has been quiet for the debounce delay.
//! A forced refresh skips the delay and drops the pending deadline.
//!
//! The state machine is clock-agnostic: callers pass `now` in and decide how
//! to sleep until [`Debouncer::deadline`].

use crate::time::{secs_to_ms, Timestamp};

/// What the caller should do after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceAction {
    /// Recompute immediately
    RunNow,
    /// Recompute at the deadline unless another request comes first
    Armed(Timestamp),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debouncer {
    delay_ms: u64,
    pending: Option<Timestamp>,
}

impl Debouncer {
    pub fn new(delay_secs: u64) -> Self {
        Self {
            delay_ms: secs_to_ms(delay_secs),
            pending: None,
        }
    }

    /// Change the delay; an armed deadline keeps its old value
    pub fn set_delay_secs(&mut self, delay_secs: u64) {
        self.delay_ms = secs_to_ms(delay_secs);
    }

    /// Register a change at `now`, replacing any pending deadline
    pub fn request(&mut self, now: Timestamp) -> DebounceAction {
        if self.delay_ms == 0 {
            self.pending = None;
            return DebounceAction::RunNow;
        }
        let deadline = now.saturating_add(self.delay_ms);
        self.pending = Some(deadline);
        DebounceAction::Armed(deadline)
    }

    /// Bypass the delay; returns whether a pending deadline was dropped
    pub fn force(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.pending
    }

    pub fn due(&self, now: Timestamp) -> bool {
        self.pending.is_some_and(|deadline| now >= deadline)
    }

    /// Disarm and report `true` if the deadline has passed
    pub fn take_due(&mut self, now: Timestamp) -> bool {
        if self.due(now) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_runs_now() {
        let mut debouncer = Debouncer::new(0);
        assert_eq!(debouncer.request(1_000), DebounceAction::RunNow);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn burst_collapses_to_one_deadline() {
        let mut debouncer = Debouncer::new(2);
        assert_eq!(debouncer.request(0), DebounceAction::Armed(2_000));
        assert_eq!(debouncer.request(500), DebounceAction::Armed(2_500));
        assert_eq!(debouncer.request(1_500), DebounceAction::Armed(3_500));

        assert!(!debouncer.take_due(3_000));
        assert!(debouncer.take_due(3_500));
        assert!(!debouncer.take_due(10_000));
    }

    #[test]
    fn force_drops_pending_without_rearming() {
        let mut debouncer = Debouncer::new(2);
        debouncer.request(0);
        assert!(debouncer.force());
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.due(5_000));
        assert!(!debouncer.force());
    }

    #[test]
    fn cancel() {
        let mut debouncer = Debouncer::new(2);
        debouncer.request(0);
        debouncer.cancel();
        assert!(!debouncer.due(2_000));
    }
}
