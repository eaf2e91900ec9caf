//! Host capabilities the engine depends on
//!
//! The engine never reaches into the host. Everything it needs from the
//! outside is one of these small traits, implemented by the host adapter (or
//! by a test double):
//!
//! - [`ReadingSource`]: latest reading of a subject
//! - [`ConfigSource`]: current configuration record
//! - [`NotificationSink`]: outbound notifications for automations
//! - [`SnapshotPublisher`]: broadcast of the state after each recompute
//!
//! Async counterparts for hosted runtimes live in the connectors crate.

use crate::config::ConfigRecord;
use crate::events::AdjacencyEvent;
use crate::reading::LocationReading;
use crate::state::AdjacencySnapshot;
use crate::subject::SubjectId;

/// Latest known reading of a subject
pub trait ReadingSource {
    /// `None` when the host does not know the subject or its state is unknown
    fn reading(&self, subject: &SubjectId) -> Option<LocationReading>;
}

/// Current configuration record, re-read before every recompute
pub trait ConfigSource {
    fn config_record(&self) -> ConfigRecord;
}

/// Receives outbound notifications
pub trait NotificationSink {
    fn notify(&mut self, event: AdjacencyEvent);
}

/// Receives the snapshot published after every recompute
pub trait SnapshotPublisher {
    fn publish(&mut self, snapshot: &AdjacencySnapshot);
}

impl ConfigSource for ConfigRecord {
    fn config_record(&self) -> ConfigRecord {
        self.clone()
    }
}

impl NotificationSink for alloc::vec::Vec<AdjacencyEvent> {
    fn notify(&mut self, event: AdjacencyEvent) {
        self.push(event);
    }
}

/// Discards everything it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl NotificationSink for Discard {
    fn notify(&mut self, _event: AdjacencyEvent) {}
}

impl SnapshotPublisher for Discard {
    fn publish(&mut self, _snapshot: &AdjacencySnapshot) {}
}
