//! Async service driving one adjacency engine
//!
//! ## Overview
//!
//! Each [`AdjacencyService`] runs as a single tokio task that owns its engine
//! outright. The host never touches the engine directly; it sends
//! [`Trigger`]s and reads snapshots from a `watch` channel. One task per pair
//! means recomputes are serialized without locks.
//!
//! ```text
//!  ChangeFeed ──┐
//!               ├─► mpsc<Trigger> ─► [ task: debounce ─► recompute ] ─► sinks
//!  ServiceHandle┘                                   │
//!                                                   └─► watch<AdjacencySnapshot>
//! ```
//!
//! ## Scheduling
//!
//! - `SubjectChanged` / `Refresh` re-arm the debounce deadline; the recompute
//!   runs once the deadline passes with no newer trigger
//! - `ForceRefresh` drops any pending deadline and recomputes at once,
//!   optionally asking the subjects' sources for fresh readings first
//! - `Stop` cancels the pending deadline and unsubscribes from the change
//!   feed; a recompute already running finishes first
//!
//! The debounce delay is re-read from the engine's configuration whenever a
//! trigger arrives, so a reload takes effect on the next burst.

use std::sync::Arc;
use std::time::Duration;

use adjacency_core::debounce::{DebounceAction, Debouncer};
use adjacency_core::{
    AdjacencyEngine, AdjacencyEvent, AdjacencySnapshot, ConfigSource, CycleOutcome, Side,
    SubjectId, TimeSource, Timestamp, Transition,
};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    AsyncNotificationSink, AsyncReadingSource, ChangeFeed, ConnectorError, ConnectorResult,
    SourceRefresher, Subscription,
};

/// Wait after an active source refresh before reading state
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Subjects whose sources cannot be asked for a fresh reading
const STATIC_SUBJECT_PREFIX: &str = "zone.";

/// Message to a running service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A tracked subject's reading changed
    SubjectChanged(SubjectId),
    /// Debounced manual refresh
    Refresh,
    /// Immediate refresh; with `source_update` the sources are polled first
    ForceRefresh { source_update: bool },
    /// Shut the service down
    Stop,
}

pub type TriggerSender = mpsc::UnboundedSender<Trigger>;

/// Engine plus everything it needs from the host
pub struct AdjacencyService<T: TimeSource> {
    engine: AdjacencyEngine<T>,
    readings: Arc<dyn AsyncReadingSource>,
    config: Arc<dyn ConfigSource + Send + Sync>,
    sinks: Vec<Arc<dyn AsyncNotificationSink>>,
    refresher: Option<Arc<dyn SourceRefresher>>,
    feed: Option<Arc<dyn ChangeFeed>>,
    settle_delay: Duration,
}

impl<T: TimeSource + Send + Sync + 'static> AdjacencyService<T> {
    pub fn new(
        engine: AdjacencyEngine<T>,
        readings: Arc<dyn AsyncReadingSource>,
        config: Arc<dyn ConfigSource + Send + Sync>,
    ) -> Self {
        Self {
            engine,
            readings,
            config,
            sinks: Vec::new(),
            refresher: None,
            feed: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Add a notification sink; every sink receives every notification
    pub fn with_sink(mut self, sink: Arc<dyn AsyncNotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn SourceRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Subscribe to both subjects on start
    pub fn with_change_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Start the service task
    ///
    /// The first recompute runs right away. Must be called inside a tokio
    /// runtime.
    pub fn spawn(self) -> ServiceHandle {
        let (triggers, receiver) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(self.engine.snapshot());
        let feed_sender = triggers.clone();

        let task = tokio::spawn(self.run(receiver, feed_sender, snapshots));

        ServiceHandle {
            triggers,
            snapshots: snapshot_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut triggers: mpsc::UnboundedReceiver<Trigger>,
        feed_sender: TriggerSender,
        snapshots: watch::Sender<AdjacencySnapshot>,
    ) {
        let pair = self.engine.pair_key();
        let subscription = self.subscribe(feed_sender).await;
        info!("{}: adjacency service started", pair);

        self.recompute(&snapshots).await;

        let origin = Instant::now();
        let mut debouncer = Debouncer::new(self.engine.config().debounce_seconds());

        loop {
            let deadline = debouncer
                .deadline()
                .and_then(|ms| origin.checked_add(Duration::from_millis(ms)));

            tokio::select! {
                trigger = triggers.recv() => match trigger {
                    None | Some(Trigger::Stop) => break,
                    Some(Trigger::SubjectChanged(subject)) => {
                        debug!("{}: {} changed", pair, subject);
                        self.schedule(&mut debouncer, elapsed_ms(origin), &snapshots).await;
                    }
                    Some(Trigger::Refresh) => {
                        self.schedule(&mut debouncer, elapsed_ms(origin), &snapshots).await;
                    }
                    Some(Trigger::ForceRefresh { source_update }) => {
                        if debouncer.force() {
                            debug!("{}: pending recompute superseded by forced refresh", pair);
                        }
                        if source_update {
                            self.request_source_updates().await;
                        }
                        self.recompute(&snapshots).await;
                    }
                },
                _ = sleep_until(deadline) => {
                    if debouncer.take_due(elapsed_ms(origin)) {
                        self.recompute(&snapshots).await;
                    }
                }
            }
        }

        debouncer.cancel();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        info!("{}: adjacency service stopped", pair);
    }

    async fn subscribe(&self, sender: TriggerSender) -> Option<Subscription> {
        let feed = self.feed.as_ref()?;
        let subjects = vec![
            self.engine.subject(Side::A).id.clone(),
            self.engine.subject(Side::B).id.clone(),
        ];
        match feed.subscribe(subjects, sender).await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!("{}: change feed unavailable: {}", self.engine.pair_key(), err);
                None
            }
        }
    }

    async fn schedule(
        &mut self,
        debouncer: &mut Debouncer,
        now: Timestamp,
        snapshots: &watch::Sender<AdjacencySnapshot>,
    ) {
        debouncer.set_delay_secs(self.engine.config().debounce_seconds());
        if debouncer.request(now) == DebounceAction::RunNow {
            self.recompute(snapshots).await;
        }
    }

    /// Best effort; failures only show up in debug logs
    async fn request_source_updates(&self) {
        let Some(refresher) = &self.refresher else {
            return;
        };
        for side in [Side::A, Side::B] {
            let subject = &self.engine.subject(side).id;
            if subject.as_str().starts_with(STATIC_SUBJECT_PREFIX) {
                continue;
            }
            if let Err(err) = refresher.request_update(subject).await {
                debug!("{}: source update for {} failed: {}", self.engine.pair_key(), subject, err);
            }
        }
        tokio::time::sleep(self.settle_delay).await;
    }

    async fn recompute(&mut self, snapshots: &watch::Sender<AdjacencySnapshot>) {
        // An invalid record is logged by the engine and the old config stays
        let _ = self.engine.reload_config(&*self.config);

        let reading_a = self.readings.reading(&self.engine.subject(Side::A).id).await;
        let reading_b = self.readings.reading(&self.engine.subject(Side::B).id).await;

        let mut fired: Vec<AdjacencyEvent> = Vec::new();
        let outcome = self
            .engine
            .recompute(reading_a.as_ref(), reading_b.as_ref(), &mut fired);
        self.log_outcome(&outcome);

        let fired_at = self.engine.time().now();
        for event in &fired {
            self.deliver(event, fired_at).await;
        }

        snapshots.send_replace(self.engine.snapshot());
    }

    async fn deliver(&self, event: &AdjacencyEvent, fired_at: Timestamp) {
        for sink in &self.sinks {
            if let Err(err) = sink.deliver(event, fired_at).await {
                warn!(
                    "{}: {} delivery via {} failed: {}",
                    self.engine.pair_key(),
                    event.name(),
                    sink.name(),
                    err
                );
            }
        }
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Valid { distance_m, transition: Transition::Entered, reliable } => {
                info!(
                    "{}: entered proximity at {:.0} m (reliable: {})",
                    self.engine.pair_key(),
                    distance_m,
                    reliable
                );
            }
            CycleOutcome::Valid { distance_m, transition: Transition::Left, .. } => {
                info!("{}: left proximity at {:.0} m", self.engine.pair_key(), distance_m);
            }
            _ => {}
        }
    }
}

/// Control side of a running service
#[derive(Debug)]
pub struct ServiceHandle {
    triggers: TriggerSender,
    snapshots: watch::Receiver<AdjacencySnapshot>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn trigger(&self, trigger: Trigger) -> ConnectorResult<()> {
        self.triggers
            .send(trigger)
            .map_err(|_| ConnectorError::ChannelClosed)
    }

    pub fn subject_changed(&self, subject: impl Into<SubjectId>) -> ConnectorResult<()> {
        self.trigger(Trigger::SubjectChanged(subject.into()))
    }

    pub fn refresh(&self) -> ConnectorResult<()> {
        self.trigger(Trigger::Refresh)
    }

    pub fn force_refresh(&self, source_update: bool) -> ConnectorResult<()> {
        self.trigger(Trigger::ForceRefresh { source_update })
    }

    /// Sender for host-side change callbacks
    pub fn sender(&self) -> TriggerSender {
        self.triggers.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> AdjacencySnapshot {
        self.snapshots.borrow().clone()
    }

    /// Independent receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<AdjacencySnapshot> {
        self.snapshots.clone()
    }

    /// Stop the service and wait for the task to finish
    pub async fn stop(self) -> ConnectorResult<()> {
        // Already gone if the send fails; the join below reports how it ended
        let _ = self.triggers.send(Trigger::Stop);
        self.task
            .await
            .map_err(|e| ConnectorError::ProtocolError(e.to_string()))
    }
}

fn elapsed_ms(origin: Instant) -> Timestamp {
    origin.elapsed().as_millis() as Timestamp
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
