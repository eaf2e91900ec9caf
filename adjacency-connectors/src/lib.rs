//! Runtime Connectors for the Adjacency Engine
//!
//! ## Overview
//!
//! The core engine is synchronous and host-agnostic. This crate puts it to
//! work inside an async host:
//!
//! - [`service`]: one tokio task per engine, fed by change triggers, with
//!   debouncing, forced refreshes and snapshot broadcast
//! - [`sinks`]: where notifications go (in-process channel, MQTT, webhook)
//! - [`payload`]: the JSON shape every external sink receives
//!
//! ## Host Capabilities
//!
//! Hosts plug in through async traits mirroring the core's sync ones:
//!
//! | Capability | Trait |
//! |------------|-------|
//! | Latest reading of a subject | [`AsyncReadingSource`] |
//! | Change notifications | [`ChangeFeed`] + [`Subscription`] |
//! | Best-effort "report your position now" | [`SourceRefresher`] |
//! | Outbound notifications | [`AsyncNotificationSink`] |
//!
//! Configuration stays on the core's [`adjacency_core::ConfigSource`]: it is
//! a cheap value read at the top of every recompute.
//!
//! ## Sink Selection
//!
//! | Sink | Feature | Use |
//! |------|---------|-----|
//! | `ChannelSink` | `std` | same-process automations, tests |
//! | `MqttSink` | `mqtt` | home automation brokers, topic per notification |
//! | `WebhookSink` | `http` | REST endpoints, retried with backoff |
//!
//! Delivery failures are logged and never stop the engine. A notification
//! that cannot be delivered is dropped; the next state change produces a
//! fresh one.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use adjacency_connectors::service::AdjacencyService;
//! use adjacency_connectors::sinks::ChannelSink;
//! # use adjacency_connectors::AsyncReadingSource;
//! # use adjacency_core::{AdjacencyConfig, AdjacencyEngine, ConfigRecord, SystemTime};
//! # async fn example(readings: Arc<dyn AsyncReadingSource>) {
//! let engine = AdjacencyEngine::new("person.alice", "person.bob", AdjacencyConfig::default(), SystemTime);
//! let (sink, mut notifications) = ChannelSink::new();
//!
//! let handle = AdjacencyService::new(engine, readings, Arc::new(ConfigRecord::default()))
//!     .with_sink(Arc::new(sink))
//!     .spawn();
//!
//! handle.force_refresh(false).unwrap();
//! while let Some(fired) = notifications.recv().await {
//!     println!("{} at {}", fired.event.name(), fired.fired_at);
//! }
//! # }
//! ```

#[cfg(feature = "std")]
pub mod payload;
#[cfg(feature = "std")]
pub mod service;
#[cfg(feature = "std")]
pub mod sinks;

use adjacency_core::{AdjacencyEvent, LocationReading, SubjectId, Timestamp};
use thiserror::Error;

#[cfg(feature = "std")]
pub use service::{AdjacencyService, ServiceHandle, Trigger, TriggerSender};
#[cfg(feature = "std")]
pub use sinks::{ChannelSink, FiredEvent};
#[cfg(feature = "mqtt")]
pub use sinks::mqtt::{MqttConfig, MqttSink, QoS};
#[cfg(feature = "http")]
pub use sinks::webhook::{WebhookConfig, WebhookSink};

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Latest reading of a subject, fetched from the host
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait AsyncReadingSource: Send + Sync {
    /// `None` when the subject is unknown or its state unavailable
    async fn reading(&self, subject: &SubjectId) -> Option<LocationReading>;
}

/// Host-side change notifications
///
/// The feed pushes a [`Trigger::SubjectChanged`] into `triggers` whenever one
/// of `subjects` changes, until the returned [`Subscription`] is dropped or
/// unsubscribed.
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(
        &self,
        subjects: Vec<SubjectId>,
        triggers: TriggerSender,
    ) -> ConnectorResult<Subscription>;
}

/// Asks a subject's own data source for a fresh reading
///
/// Best effort: failures are logged by the caller and otherwise ignored.
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait SourceRefresher: Send + Sync {
    async fn request_update(&self, subject: &SubjectId) -> ConnectorResult<()>;
}

/// Outbound delivery of notifications
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait AsyncNotificationSink: Send + Sync {
    /// Deliver one notification fired at `fired_at`
    async fn deliver(&self, event: &AdjacencyEvent, fired_at: Timestamp) -> ConnectorResult<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Handle to an active change-feed registration
///
/// Unsubscribes when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Subscription with nothing to cancel
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn subscription_cancels_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_cancels_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_display() {
        let err = ConnectorError::SourceUnavailable("person.alice".into());
        assert_eq!(err.to_string(), "Source unavailable: person.alice");
    }
}
