//! Notification sinks
//!
//! A sink receives every notification the service fires, in firing order.
//! Sinks are independent: one failing does not stop the others.

#[cfg(feature = "mqtt")]
pub mod mqtt;
#[cfg(feature = "http")]
pub mod webhook;

use adjacency_core::{AdjacencyEvent, Timestamp};
use tokio::sync::mpsc;

use crate::{AsyncNotificationSink, ConnectorError, ConnectorResult};

/// Notification together with the time it fired
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEvent {
    pub event: AdjacencyEvent,
    pub fired_at: Timestamp,
}

/// In-process sink backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<FiredEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl AsyncNotificationSink for ChannelSink {
    async fn deliver(&self, event: &AdjacencyEvent, fired_at: Timestamp) -> ConnectorResult<()> {
        self.sender
            .send(FiredEvent {
                event: event.clone(),
                fired_at,
            })
            .map_err(|_| ConnectorError::ChannelClosed)
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjacency_core::events::LeavePayload;
    use adjacency_core::SubjectId;

    fn leave() -> AdjacencyEvent {
        AdjacencyEvent::Left(LeavePayload {
            entity_a: SubjectId::from("person.alice"),
            entity_b: SubjectId::from("person.bob"),
            distance_m: 900,
            entry_threshold_m: 500.0,
            exit_threshold_m: 700.0,
        })
    }

    #[tokio::test]
    async fn channel_sink_forwards() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.deliver(&leave(), 42).await.unwrap();

        let fired = receiver.recv().await.unwrap();
        assert_eq!(fired.event, leave());
        assert_eq!(fired.fired_at, 42);
    }

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        assert!(matches!(
            sink.deliver(&leave(), 0).await,
            Err(ConnectorError::ChannelClosed)
        ));
    }
}
